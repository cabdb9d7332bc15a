// GUI-subsystem binary: no console window is ever allocated by Windows.
// • GUI mode: nothing extra needed - no console to free.
// • CLI mode (--base/-b flag present): AttachConsole(ATTACH_PARENT_PROCESS) attaches to
//   the launching terminal so println!/eprintln! reach it.
#![windows_subsystem = "windows"]

use eframe::egui;
use imagestacker::app::StackerApp;
use imagestacker::{cli, logger};

fn main() -> Result<(), eframe::Error> {
    #[cfg(target_os = "windows")]
    if cli::CliArgs::is_cli_mode() {
        use winapi::um::wincon::{AttachConsole, ATTACH_PARENT_PROCESS};
        unsafe {
            AttachConsole(ATTACH_PARENT_PROCESS);
        }
    }

    logger::init();

    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        std::process::exit(cli::run(args));
    }

    // -- GUI mode -----------------------------------------------------
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("ImageStacker"),
        ..Default::default()
    };

    eframe::run_native(
        "ImageStacker",
        options,
        Box::new(|cc| Box::new(StackerApp::new(cc))),
    )
}
