use anyhow::Result;
use log::info;

mod capture;
mod clipboard;
mod error;
mod ocr;
mod selection;
mod selection_logic;
mod session;

use capture::XcapSource;
use clipboard::SystemClipboard;
use ocr::Tesseract;
use session::SnipSession;

fn main() -> Result<()> {
    env_logger::init();
    info!("snipocr starting");

    // capture or overlay failures end here with a non-zero exit
    let session = SnipSession::new(Tesseract::new(), SystemClipboard::default());
    let outcome = session.run(&XcapSource)?;

    info!("Session finished: {outcome:?}");
    println!("{outcome}");
    Ok(())
}
