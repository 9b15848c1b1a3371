//! Subcommand implementations.
//!
//! Each function calls the library facade and formats the result; no
//! atlas logic lives here.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use brainatlas::{AtlasError, AtlasLibrary, AtlasVersion, ProgressCallback, VersionPolicy};

/// Print the merged installed/available atlas listing.
pub fn list(library: &AtlasLibrary) -> Result<(), AtlasError> {
    let listings = library.list()?;

    if listings.is_empty() {
        println!("no atlases installed or published");
        return Ok(());
    }

    let name_width = listings
        .iter()
        .map(|l| l.name.len())
        .max()
        .unwrap_or(4)
        .max("name".len());

    println!("{:<name_width$}  installed  local    latest", "name");
    for listing in listings {
        let local = listing
            .local_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let latest = listing
            .latest_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        let installed = if listing.installed { "yes" } else { "no" };

        println!(
            "{:<name_width$}  {:<9}  {:<7}  {}",
            listing.name, installed, local, latest
        );
    }
    Ok(())
}

/// Install an atlas; already-installed versions are reused.
pub fn install(
    library: &AtlasLibrary,
    name: &str,
    version: Option<AtlasVersion>,
) -> Result<(), AtlasError> {
    let policy = match version {
        Some(version) => VersionPolicy::Exact(version),
        None => VersionPolicy::AnyInstalled,
    };
    open_with_bar(library, name, &policy)
}

/// Update an atlas to the latest published version.
pub fn update(library: &AtlasLibrary, name: &str) -> Result<(), AtlasError> {
    open_with_bar(library, name, &VersionPolicy::Latest)
}

/// Remove every installed version of an atlas.
pub fn remove(library: &AtlasLibrary, name: &str) -> Result<(), AtlasError> {
    library.delete(name)?;
    println!("removed {}", name);
    Ok(())
}

/// Show metadata and a taxonomy summary.
pub fn info(library: &AtlasLibrary, name: &str) -> Result<(), AtlasError> {
    let atlas = library.open(name, &VersionPolicy::AnyInstalled)?;
    let metadata = atlas.metadata();

    println!("name:        {} (v{})", atlas.name(), atlas.version());
    println!("species:     {}", metadata.species);
    println!("citation:    {}", metadata.citation);
    println!("link:        {}", metadata.atlas_link);
    println!("orientation: {}", metadata.orientation);
    println!("symmetric:   {}", metadata.symmetric);
    println!("resolution:  {:?} um", metadata.resolution);
    println!("shape:       {:?}", metadata.shape);
    println!("regions:     {}", atlas.structures().len());
    println!("root:        {}", atlas.root().acronym());
    Ok(())
}

fn open_with_bar(
    library: &AtlasLibrary,
    name: &str,
    policy: &VersionPolicy,
) -> Result<(), AtlasError> {
    let bar = ProgressBar::hidden();
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
            .expect("static template is valid"),
    );

    let bar_in_callback = bar.clone();
    let progress: ProgressCallback = Box::new(move |done, total| {
        if total > 0 && bar_in_callback.length() != Some(total) {
            bar_in_callback.set_length(total);
            bar_in_callback.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
        bar_in_callback.set_position(done);
    });

    let atlas = library.open_with_progress(name, policy, Some(&progress))?;
    bar.finish_and_clear();

    info!("atlas {} v{} ready", atlas.name(), atlas.version());
    println!(
        "{} v{} installed at {}",
        atlas.name(),
        atlas.version(),
        atlas.dir().display()
    );
    Ok(())
}
