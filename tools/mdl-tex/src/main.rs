use std::path::{Path, PathBuf};
use std::process::Command;

use clap::{Parser, Subcommand};
use image::Rgba;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "MDL texture tool")]
#[command(about, author, version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the textures stored in the model
    #[command(arg_required_else_help = true)]
    Ls {
        /// Model file
        file: PathBuf,
    },
    /// Decode every texture of the model to PNG
    #[command(arg_required_else_help = true)]
    Export {
        /// Model file
        file: PathBuf,
        /// Outbound directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
        /// Overwrite files
        #[arg(short, long, default_value_t = false, value_name = "TRUE|FALSE")]
        force: bool,
    },
    /// Replace one texture with an image converted by the native encoder
    #[command(arg_required_else_help = true)]
    Inject {
        /// Model file
        file: PathBuf,
        /// Replacement image passed to the encoder
        image: PathBuf,
        /// Index of the texture to replace
        index: usize,
        /// Encoder program, invoked as `PROG -<format> <image> <output>`
        #[arg(long, env = "MDL_TEX_ENCODER", default_value = "TGAtoBTI")]
        encoder: String,
        /// Patched model, `<stem>.new.mdl` next to the input by default
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let stdout = console::Term::stdout();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ls { file } => command_ls(stdout, file)?,
        Commands::Export { file, out, force } => command_export(file, out, force)?,
        Commands::Inject {
            file,
            image,
            index,
            encoder,
            output,
        } => command_inject(file, image, index, encoder, output)?,
    }

    Ok(())
}

fn command_ls(stdout: console::Term, file: PathBuf) -> Result<()> {
    let model = mdl::Model::open_path(&file)?;

    for (index, offset) in model.texture_offsets().iter().enumerate() {
        let line = match model.texture(index) {
            Ok(texture) => format!(
                "{index:>4}  0x{offset:08X}  {:<6}  {}x{}  {} bytes",
                texture.header.format,
                texture.header.width,
                texture.header.height,
                texture.payload.len()
            ),
            Err(err) => format!("{index:>4}  0x{offset:08X}  unreadable: {err}"),
        };
        stdout.write_line(&line).into_diagnostic()?;
    }

    let text = format!("Total textures: {};", model.texture_count());
    stdout.write_line(&text).into_diagnostic()?;

    Ok(())
}

fn command_export(file: PathBuf, out: PathBuf, force: bool) -> Result<()> {
    let model = mdl::Model::open_path(&file)?;
    let stem = file_stem(&file);
    std::fs::create_dir_all(&out).into_diagnostic()?;

    let bar = indicatif::ProgressBar::new(model.texture_count() as u64);
    bar.set_style(get_bar_style()?);

    let mut failed = 0usize;
    for (index, result) in model.decode_all() {
        let path = out.join(png_name(&stem, index));
        bar.set_message(path.display().to_string());

        let saved = result
            .map_err(miette::Report::from)
            .and_then(|decoded| {
                if !force && path.exists() && !confirm_overwrite(&path)? {
                    return Ok(false);
                }
                save_png(decoded, &path)?;
                Ok(true)
            });

        match saved {
            Ok(true) => tracing::debug!("texture {index} written to {}", path.display()),
            Ok(false) => tracing::info!("texture {index} skipped"),
            Err(err) => {
                bar.suspend(|| eprintln!("texture {index}: {err:?}"));
                failed += 1;
            }
        }
        bar.inc(1);
    }

    bar.finish();

    if failed > 0 {
        return Err(miette!(
            "{failed} of {} textures could not be exported",
            model.texture_count()
        ));
    }

    Ok(())
}

fn command_inject(
    file: PathBuf,
    image: PathBuf,
    index: usize,
    encoder: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let model = mdl::Model::open_path(&file)?;
    let texture = model.texture(index)?;

    let tmp = tempdir::TempDir::new("mdl-tex").into_diagnostic()?;
    let converted = tmp.path().join("converted.bti");
    let flag = format!("-{}", texture.header.format.name());

    tracing::info!(
        "converting {} with {encoder} {flag}",
        image.display()
    );
    let status = Command::new(&encoder)
        .arg(&flag)
        .arg(&image)
        .arg(&converted)
        .status()
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to run encoder `{encoder}`"))?;

    if !status.success() {
        return Err(miette!("encoder `{encoder}` failed: {status}"));
    }
    if !converted.exists() {
        return Err(miette!(
            "encoder `{encoder}` did not produce {}",
            converted.display()
        ));
    }

    let blob = std::fs::read(&converted).into_diagnostic()?;
    let patched = model.inject_texture(index, &blob)?;

    let output = output.unwrap_or_else(|| default_output_path(&file));
    if output.exists() && !confirm_overwrite(&output)? {
        return Ok(());
    }
    std::fs::write(&output, patched).into_diagnostic()?;
    tracing::info!("texture {index} replaced, written to {}", output.display());

    Ok(())
}

fn save_png(decoded: gxtex::DecodedImage, path: &Path) -> Result<()> {
    let img = image::ImageBuffer::<Rgba<u8>, _>::from_raw(
        decoded.width,
        decoded.height,
        decoded.rgba8,
    )
    .ok_or_else(|| miette!("raster does not match its dimensions"))?;

    img.save(path).into_diagnostic()
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    let message = format!("File \"{}\" exists. Overwrite it?", path.display());
    dialoguer::Confirm::new()
        .with_prompt(message)
        .interact()
        .into_diagnostic()
}

fn get_bar_style() -> Result<indicatif::ProgressStyle> {
    Ok(
        indicatif::ProgressStyle::with_template("[{bar:32}] {pos:>7}/{len:7} {msg}")
            .into_diagnostic()?
            .progress_chars("=>-"),
    )
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("model"))
}

fn png_name(stem: &str, index: usize) -> String {
    format!("{stem}_{index}.png")
}

fn default_output_path(file: &Path) -> PathBuf {
    file.with_file_name(format!("{}.new.mdl", file_stem(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_follow_input_stem() {
        let file = Path::new("data/models/tree.mdl");
        assert_eq!(png_name(&file_stem(file), 3), "tree_3.png");
        assert_eq!(
            default_output_path(file),
            PathBuf::from("data/models/tree.new.mdl")
        );
    }

    #[test]
    fn cli_reads_inject_arguments() {
        let cli = Cli::try_parse_from([
            "mdl-tex",
            "inject",
            "tree.mdl",
            "bark.png",
            "2",
            "--encoder",
            "encoder.exe",
        ])
        .expect("failed to parse arguments");

        match cli.command {
            Commands::Inject {
                index,
                encoder,
                output,
                ..
            } => {
                assert_eq!(index, 2);
                assert_eq!(encoder, "encoder.exe");
                assert_eq!(output, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
