use anyhow::{Context, Result};
use clap::Parser;
use image::RgbaImage;
use std::path::PathBuf;

use regalia_overlay::accessory::AccessoryKind;
use regalia_overlay::config::Config;
use regalia_overlay::landmark::LandmarkSet;
use regalia_overlay::pipeline::Tick;
use regalia_overlay::replay::read_recording;
use regalia_overlay::session::OverlaySession;

/// 記録したランドマーク列を再生し、平滑化後の配置をJSON行で出力する
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// JSON-lines landmark recording
    recording: PathBuf,

    /// path to config.toml (defaults are used if missing)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// write one overlay PNG per frame into this folder
    #[arg(long)]
    render_dir: Option<PathBuf>,

    /// crown image
    #[arg(long)]
    crown: Option<PathBuf>,

    /// medal image
    #[arg(long)]
    medal: Option<PathBuf>,

    /// trophy image
    #[arg(long)]
    trophy: Option<PathBuf>,
}

impl Cli {
    fn asset(&self, kind: AccessoryKind) -> Option<&PathBuf> {
        match kind {
            AccessoryKind::Crown => self.crown.as_ref(),
            AccessoryKind::Medal => self.medal.as_ref(),
            AccessoryKind::Trophy => self.trophy.as_ref(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config);
    let mut session = OverlaySession::new(&config)?;
    for kind in AccessoryKind::ALL {
        if let Some(path) = cli.asset(kind) {
            let image = image::open(path)
                .with_context(|| format!("failed to load {} image {}", kind, path.display()))?
                .to_rgba8();
            log::info!("{}: {}x{} asset", kind, image.width(), image.height());
            session.set_asset(kind, image)?;
        }
    }

    let frames = read_recording(&cli.recording)?;
    log::info!("replaying {} frames", frames.len());

    if let Some(dir) = &cli.render_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut skipped = 0usize;
    for (i, frame) in frames.iter().enumerate() {
        for kind in AccessoryKind::ALL {
            let mut detector = |_: f64| -> Result<Vec<LandmarkSet>> {
                Ok(frame.landmarks_for(kind).cloned().into_iter().collect())
            };
            if session.tick(kind, &mut detector, &frame.geometry, frame.timestamp_ms) == Tick::Skipped {
                skipped += 1;
            }
        }

        let line = serde_json::json!({
            "timestamp_ms": frame.timestamp_ms,
            "crown": session.pipeline(AccessoryKind::Crown).snapshot(),
            "medal": session.pipeline(AccessoryKind::Medal).snapshot(),
            "trophy": session.pipeline(AccessoryKind::Trophy).snapshot(),
        });
        println!("{}", line);

        if let Some(dir) = &cli.render_dir {
            let g = &frame.geometry;
            if g.validate().is_err() {
                continue;
            }
            let mut canvas = RgbaImage::new(g.display_width.round() as u32, g.display_height.round() as u32);
            if canvas.width() == 0 || canvas.height() == 0 {
                continue;
            }
            session.compose_capture(&mut canvas, g.display_width, g.display_height)?;
            let path = dir.join(format!("{:06}.png", i));
            canvas
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }

    if skipped > 0 {
        log::warn!("{} accessory frames skipped for invalid geometry", skipped);
    }
    log::info!("done");
    Ok(())
}
