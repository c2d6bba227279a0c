// Headless mode (--output-dir/-o present) runs the same controller without a
// window and exits with 0 on success, 1 on failure.

use std::sync::Arc;

use clap::Parser;
use eframe::egui;

use rainbow_scratch::app::ScratchApp;
use rainbow_scratch::cli::{self, CliArgs};
use rainbow_scratch::controller::Controller;
use rainbow_scratch::export::SaveDialogSink;
use rainbow_scratch::ingest::DialogPicker;
use rainbow_scratch::{log_err, logger};

fn main() -> Result<(), eframe::Error> {
    let args = CliArgs::parse();

    // -- CLI / headless mode ---------------------------------------------
    if args.is_cli_mode() {
        logger::init(args.verbose);
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------
    logger::init(false);

    let settings = args.settings();
    let (w, h) = (settings.width as f32, settings.height as f32);

    // A wiring error means a dead button; refuse to start
    let controller = match Controller::new(
        settings,
        Arc::new(DialogPicker::default()),
        Box::new(SaveDialogSink),
    ) {
        Ok(c) => c,
        Err(e) => {
            log_err!("Startup failed: {}", e);
            eprintln!("fatal: {}", e);
            std::process::exit(2);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([w, h + 32.0])
            .with_title("Rainbow Scratch Paper"),
        ..Default::default()
    };

    eframe::run_native(
        "Rainbow Scratch Paper",
        options,
        Box::new(move |cc| Box::new(ScratchApp::new(cc, controller))),
    )
}
