use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use walkdir::WalkDir;

use gallery::GalleryStore;
use pipeline::FacePipeline;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://gallery.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed every photo under ROOT/<name>/ and add it to the gallery.
    Ingest {
        root: PathBuf,
        /// Prefix for the stored photo URLs.
        #[arg(long, default_value = "/static")]
        photo_base_url: String,
    },
    /// Print the gallery size.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = GalleryStore::new(&cli.database_url).await?;

    match cli.command {
        Command::Ingest {
            root,
            photo_base_url,
        } => ingest(&store, &root, &photo_base_url).await?,
        Command::Stats => {
            println!("gallery entries: {}", store.count().await?);
        }
    }

    Ok(())
}

async fn ingest(store: &GalleryStore, root: &Path, photo_base_url: &str) -> Result<()> {
    let photos = collect_photos(root)?;
    if photos.is_empty() {
        println!("no photos found under {}", root.display());
        return Ok(());
    }

    let pipeline = FacePipeline::new();
    let bar = ProgressBar::new(photos.len() as u64);
    let mut stored = 0usize;
    let mut skipped = 0usize;

    for (name, path) in photos {
        bar.inc(1);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let face = match pipeline.prepare(&bytes) {
            Ok(face) => face,
            Err(err) => {
                bar.println(format!("skipping {}: {err}", path.display()));
                skipped += 1;
                continue;
            }
        };
        let embedding = pipeline.embed(&face);
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let photo_url = format!("{photo_base_url}/{name}/{file_name}");
        store
            .insert_entry(&name, &photo_url, embedding.as_slice())
            .await?;
        stored += 1;
    }

    bar.finish_and_clear();
    println!("stored {stored} photos ({skipped} skipped)");
    Ok(())
}

/// Photos live two levels deep: one directory per person, images inside.
fn collect_photos(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut photos = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png") {
            continue;
        }
        let name = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            continue;
        }
        photos.push((name, entry.into_path()));
    }
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn collects_named_photos_and_ignores_everything_else() {
        let root = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(root.path().join("Rex")).expect("dir");
        fs::create_dir_all(root.path().join("Ada").join("deep")).expect("dir");
        fs::write(root.path().join("Rex").join("0.JPG"), b"x").expect("file");
        fs::write(root.path().join("Rex").join("notes.txt"), b"x").expect("file");
        fs::write(root.path().join("Ada").join("1.png"), b"x").expect("file");
        fs::write(root.path().join("Ada").join("deep").join("2.png"), b"x").expect("file");
        fs::write(root.path().join("stray.jpg"), b"x").expect("file");

        let photos = collect_photos(root.path()).expect("collect");
        let names: Vec<&str> = photos.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Rex"]);
        assert!(photos[0].1.ends_with("Ada/1.png"));
        assert!(photos[1].1.ends_with("Rex/0.JPG"));
    }
}
