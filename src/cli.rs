// ============================================================================
// Headless mode — scratch and export without opening a window
// ============================================================================
//
// Usage examples:
//   RainbowScratchPaper -o out/                                  (cover only)
//   RainbowScratchPaper -o out/ --seed 7 --scratch 0,0,800,600
//   RainbowScratchPaper -o out/ --background photo.jpg --cover foil.png \
//       --brush 5 --scratch 100,300,700,300 --scratch 400,50,400,550
//
// The export lands at `<output-dir>/RainbowScratchPaper Screenshot.png`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use crate::controller::Controller;
use crate::controls::{Control, UploadTarget};
use crate::export::{Delivery, DirectorySink};
use crate::ingest::{FilePicker, PathPicker, PickFuture};
use crate::logger;
use crate::settings::{DEFAULT_HEIGHT, DEFAULT_WIDTH, Settings};

/// Rainbow Scratch Paper: scratch an opaque cover to reveal a rainbow.
///
/// Without `--output-dir` the interactive window opens. With it, the
/// scratches given on the command line are applied and the result exported.
#[derive(Parser, Debug, Clone)]
#[command(name = "RainbowScratchPaper", about = "Scratch-off rainbow drawing toy")]
pub struct CliArgs {
    /// Export directory. Switches to headless mode.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Image to use as the revealed background instead of a rainbow.
    #[arg(long, value_name = "FILE")]
    pub background: Option<PathBuf>,

    /// Image to use as the cover instead of solid black.
    #[arg(long, value_name = "FILE")]
    pub cover: Option<PathBuf>,

    /// Seed for the first rainbow.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Surface width in pixels.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Brush size position 1-5 (sizes 1, 3, 7, 14, 28).
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub brush: u8,

    /// Straight scratch from (x0,y0) to (x1,y1). Repeatable.
    #[arg(long = "scratch", value_name = "X0,Y0,X1,Y1", value_parser = parse_stroke)]
    pub strokes: Vec<Stroke>,

    /// Mirror the session log to stderr and print timings.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

fn parse_stroke(s: &str) -> Result<Stroke, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("'{}': {}", s, e))?;
    match parts.as_slice() {
        [x0, y0, x1, y1] => Ok(Stroke {
            from: (*x0, *y0),
            to: (*x1, *y1),
        }),
        _ => Err(format!("'{}': expected four comma-separated numbers", s)),
    }
}

impl CliArgs {
    pub fn is_cli_mode(&self) -> bool {
        self.output_dir.is_some()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            width: self.width,
            height: self.height,
            default_brush: Control::brush(self.brush as usize).unwrap_or(Control::Brush2),
            seed: self.seed,
            export_dir: self.output_dir.clone(),
            ..Settings::default()
        }
    }
}

/// Headless runs have nobody to answer a chooser.
struct NoChooser;

impl FilePicker for NoChooser {
    fn pick(&self) -> PickFuture {
        Box::pin(async { None })
    }
}

/// Run headless and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = args.settings();
    let Some(dir) = settings.export_dir.clone() else {
        eprintln!("error: headless mode needs --output-dir");
        return ExitCode::FAILURE;
    };
    let start = Instant::now();

    let mut controller = match Controller::new(
        settings,
        Arc::new(NoChooser),
        Box::new(DirectorySink::new(dir)),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let uploads = [
        (UploadTarget::Back, &args.background),
        (UploadTarget::Front, &args.cover),
    ];
    for (target, path) in uploads {
        if let Some(path) = path {
            controller.upload_with(target, Arc::new(PathPicker::new(path.clone())));
        }
    }
    let errors = controller.wait_uploads();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("error: {}", e);
        }
        return ExitCode::FAILURE;
    }

    for stroke in &args.strokes {
        controller.pointer_down(stroke.from.0, stroke.from.1);
        controller.pointer_move(stroke.to.0, stroke.to.1);
        controller.pointer_up();
    }

    match controller.save() {
        Ok(Delivery::Written(path)) => {
            println!("{}", path.display());
            if args.verbose {
                eprintln!("done in {:.1?}", start.elapsed());
                if let Some(log) = logger::log_path() {
                    eprintln!("session log: {}", log.display());
                }
            }
            ExitCode::SUCCESS
        }
        Ok(other) => {
            eprintln!("error: export not written ({:?})", other);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strokes() {
        assert_eq!(
            parse_stroke("1, 2,3.5,4").unwrap(),
            Stroke {
                from: (1.0, 2.0),
                to: (3.5, 4.0)
            }
        );
        assert!(parse_stroke("1,2,3").is_err());
        assert!(parse_stroke("a,b,c,d").is_err());
    }

    #[test]
    fn no_output_dir_means_gui() {
        let args = CliArgs::parse_from(["RainbowScratchPaper"]);
        assert!(!args.is_cli_mode());
        assert_eq!(args.settings(), Settings::default());
    }

    #[test]
    fn arguments_flow_into_settings() {
        let args = CliArgs::parse_from([
            "RainbowScratchPaper",
            "-o",
            "out",
            "--width",
            "64",
            "--height",
            "32",
            "--brush",
            "5",
            "--seed",
            "3",
            "--scratch",
            "0,0,10,10",
            "--scratch",
            "5,5,6,6",
        ]);
        assert!(args.is_cli_mode());
        assert_eq!(args.strokes.len(), 2);

        let s = args.settings();
        assert_eq!((s.width, s.height), (64, 32));
        assert_eq!(s.default_brush, Control::Brush5);
        assert_eq!(s.seed, Some(3));
        assert_eq!(s.export_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn brush_out_of_range_is_rejected() {
        assert!(CliArgs::try_parse_from(["RainbowScratchPaper", "--brush", "6"]).is_err());
    }
}
