//! Batch rendering of position logs from files and directories.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rand::Rng;
use thiserror::Error;

use crate::config::RenderConfig;
use crate::core::loaders::{load_position_csv, LoaderError};
use crate::visualization::{
    build_scene, render_scene, scene_title, Palette, RenderOptions, VisualizationError,
};

/// Errors that can occur during batch rendering.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },

    #[error("Failed to render {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: VisualizationError,
    },
}

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Output of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Rendered images, in input order.
    pub outputs: Vec<PathBuf>,
    /// Total number of points drawn across all images.
    pub points: usize,
}

/// Image path for `input`: `output_dir/<input stem>.<image_extension>`.
///
/// Only the file name of `input` survives, so same-named logs from
/// different directories map to the same image.
pub fn output_path_for(input: &Path, output_dir: &Path, image_extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| input.as_os_str().to_os_string());
    let mut path = output_dir.join(stem);
    path.set_extension(image_extension);
    path
}

/// Files with `extension` (case-insensitive) directly inside `directory`,
/// sorted by path.
pub fn files_with_extension(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(directory).map_err(|source| BatchError::ReadDir {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Expand file and directory arguments into the list of logs to render.
///
/// Files are kept as given. Directories contribute every file with
/// `extension` directly inside them. Arguments that do not exist are an
/// error.
pub fn collect_inputs<P: AsRef<Path>>(paths: &[P], extension: &str) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let files = files_with_extension(path, extension)?;
            if files.is_empty() {
                warn!("No .{} files in {}", extension, path.display());
            }
            debug!("{}: {} files", path.display(), files.len());
            inputs.extend(files);
        } else if path.is_file() {
            inputs.push(path.to_path_buf());
        } else {
            return Err(BatchError::InputNotFound(path.to_path_buf()));
        }
    }

    Ok(inputs)
}

/// Render one position log and return the image path and point count.
pub fn render_file<R: Rng + ?Sized>(
    input: &Path,
    config: &RenderConfig,
    palette: &Palette,
    rng: &mut R,
) -> Result<(PathBuf, usize)> {
    let log = load_position_csv(input).map_err(|source| BatchError::Load {
        path: input.to_path_buf(),
        source,
    })?;

    let render_err = |source| BatchError::Render {
        path: input.to_path_buf(),
        source,
    };

    let scene = build_scene(scene_title(input), &log, config, palette, rng).map_err(render_err)?;
    let output = output_path_for(input, &config.output_dir, &config.image_extension);
    render_scene(&scene, &output, &RenderOptions::from(config)).map_err(render_err)?;

    debug!(
        "{} -> {} ({} rows, {} points)",
        input.display(),
        output.display(),
        log.len(),
        scene.point_count()
    );

    Ok((output, scene.point_count()))
}

/// Render every input in order, logging progress every
/// `config.progress_every` files.
///
/// Stops at the first failure.
pub fn render_batch<R: Rng + ?Sized>(
    inputs: &[PathBuf],
    config: &RenderConfig,
    palette: &Palette,
    rng: &mut R,
) -> Result<BatchSummary> {
    warn_on_collisions(inputs, config);

    let total = inputs.len();
    let every = config.progress_every.max(1);
    let mut summary = BatchSummary {
        outputs: Vec::with_capacity(total),
        points: 0,
    };

    for (i, input) in inputs.iter().enumerate() {
        let (output, points) = render_file(input, config, palette, rng)?;
        summary.outputs.push(output);
        summary.points += points;

        let done = i + 1;
        if done % every == 0 || done == total {
            info!("Rendered {}/{} files", done, total);
        }
    }

    Ok(summary)
}

/// Log a warning for every group of inputs that would overwrite the same
/// image.
fn warn_on_collisions(inputs: &[PathBuf], config: &RenderConfig) -> usize {
    let mut by_output: HashMap<PathBuf, Vec<&PathBuf>> = HashMap::new();
    for input in inputs {
        let output = output_path_for(input, &config.output_dir, &config.image_extension);
        by_output.entry(output).or_default().push(input);
    }

    let mut collisions = 0;
    for (output, sources) in &by_output {
        if sources.len() > 1 {
            collisions += 1;
            warn!(
                "{} inputs write to {}: {:?}",
                sources.len(),
                output.display(),
                sources
            );
        }
    }
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::make_rng;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_log(dir: &Path, name: &str, rows: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for i in 0..rows {
            writeln!(file, "{},{},{}", i, i * 2, i * 3).unwrap();
        }
        path
    }

    fn headless_config(output_dir: &Path) -> RenderConfig {
        RenderConfig {
            output_dir: output_dir.to_path_buf(),
            width: 200,
            height: 150,
            draw_text: false,
            seed: Some(1),
            ..RenderConfig::default()
        }
    }

    #[test]
    fn test_output_path_for() {
        let out = output_path_for(Path::new("runs/a/kepler.csv"), Path::new("imgs"), "png");
        assert_eq!(out, PathBuf::from("imgs/kepler.png"));

        let out = output_path_for(Path::new("plain"), Path::new("out"), "png");
        assert_eq!(out, PathBuf::from("out/plain.png"));
    }

    #[test]
    fn test_files_with_extension() {
        let temp_dir = TempDir::new().unwrap();
        create_log(temp_dir.path(), "b.csv", 1);
        create_log(temp_dir.path(), "a.CSV", 1);
        create_log(temp_dir.path(), "notes.txt", 1);
        fs::create_dir(temp_dir.path().join("sub.csv")).unwrap();

        let files = files_with_extension(temp_dir.path(), "csv").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn test_collect_inputs_mixes_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let runs = temp_dir.path().join("runs");
        fs::create_dir(&runs).unwrap();
        create_log(&runs, "r2.csv", 1);
        create_log(&runs, "r1.csv", 1);
        let single = create_log(temp_dir.path(), "single.dat", 1);

        let inputs = collect_inputs(&[single.clone(), runs.clone()], "csv").unwrap();
        assert_eq!(inputs, vec![single, runs.join("r1.csv"), runs.join("r2.csv")]);
    }

    #[test]
    fn test_collect_inputs_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.csv");
        let err = collect_inputs(&[missing.clone()], "csv").unwrap_err();
        assert!(matches!(err, BatchError::InputNotFound(p) if p == missing));
    }

    #[test]
    fn test_render_file_six_rows() {
        let temp_dir = TempDir::new().unwrap();
        let input = create_log(temp_dir.path(), "kepler.csv", 6);
        let out_dir = temp_dir.path().join("imgs");
        let config = headless_config(&out_dir);

        let mut rng = make_rng(config.seed);
        let (output, points) =
            render_file(&input, &config, &Palette::default(), &mut rng).unwrap();

        assert_eq!(output, out_dir.join("kepler.png"));
        assert!(output.exists());
        assert_eq!(points, 6);
    }

    #[test]
    fn test_render_file_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.csv");
        fs::write(&path, "1,2\n").unwrap();
        let config = headless_config(temp_dir.path());

        let mut rng = make_rng(Some(0));
        let err = render_file(&path, &config, &Palette::default(), &mut rng).unwrap_err();
        assert!(matches!(err, BatchError::Load { .. }));
    }

    #[test]
    fn test_render_file_nan_with_clip_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("n.csv");
        fs::write(&path, "nan,0,0\n1,1,1\n").unwrap();
        let config = RenderConfig {
            bodies: 1,
            clip: true,
            draw_text: true,
            ..headless_config(temp_dir.path())
        };

        let mut rng = make_rng(Some(0));
        let err = render_file(&path, &config, &Palette::default(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            BatchError::Load {
                source: crate::core::loaders::LoaderError::NonFinite { line: 1, .. },
                ..
            }
        ));
        assert!(!temp_dir.path().join("n.png").exists());
    }

    #[test]
    fn test_render_batch() {
        let temp_dir = TempDir::new().unwrap();
        let logs = temp_dir.path().join("logs");
        fs::create_dir(&logs).unwrap();
        for i in 0..3 {
            create_log(&logs, &format!("run{i}.csv"), 10);
        }
        let out_dir = temp_dir.path().join("imgs");
        let config = RenderConfig {
            sample_size: Some(4),
            progress_every: 2,
            ..headless_config(&out_dir)
        };

        let inputs = collect_inputs(&[logs], &config.input_extension).unwrap();
        let mut rng = make_rng(config.seed);
        let summary = render_batch(&inputs, &config, &Palette::default(), &mut rng).unwrap();

        assert_eq!(summary.outputs.len(), 3);
        assert_eq!(summary.points, 3 * 2 * 4);
        for i in 0..3 {
            assert!(out_dir.join(format!("run{i}.png")).exists());
        }
    }

    #[test]
    fn test_render_batch_stops_on_oversized_sample() {
        let temp_dir = TempDir::new().unwrap();
        let input = create_log(temp_dir.path(), "short.csv", 4);
        let config = RenderConfig {
            sample_size: Some(5),
            ..headless_config(temp_dir.path())
        };

        let mut rng = make_rng(Some(0));
        let err = render_batch(&[input], &config, &Palette::default(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            BatchError::Render {
                source: VisualizationError::Sampling(_),
                ..
            }
        ));
    }

    #[test]
    fn test_collisions_detected() {
        let config = RenderConfig::default();
        let inputs = vec![
            PathBuf::from("a/run.csv"),
            PathBuf::from("b/run.csv"),
            PathBuf::from("b/other.csv"),
        ];
        assert_eq!(warn_on_collisions(&inputs, &config), 1);
    }
}
