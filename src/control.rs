//! Line-oriented control socket for runtime recalibration.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crate::calibration::Calibration;

/// Bind the socket and serve commands on a background thread.
///
/// A stale socket file from an earlier run is removed first. Clients are
/// served one at a time; a stalled client holds up the socket, never the
/// decode path.
pub fn spawn(
    path: PathBuf,
    calibration: Arc<Calibration>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    let listener = UnixListener::bind(&path)?;
    log::info!("Control socket listening on {}", path.display());

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = serve_client(stream, &calibration) {
                        log::debug!("Control client dropped: {}", e);
                    }
                }
                Err(e) => log::warn!("Control socket accept failed: {}", e),
            }
        }
    });
    Ok(())
}

fn serve_client(stream: UnixStream, calibration: &Calibration) -> std::io::Result<()> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = run_command(calibration, line);
        writer.write_all(reply.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn run_command(calibration: &Calibration, line: &str) -> String {
    match line.split_once(' ') {
        None if line == "scale" => calibration.get_scale().to_string(),
        Some(("scale", quad)) => match calibration.set_scale_str(quad) {
            Ok(()) => {
                log::info!("Scale set to {}", calibration.get_scale());
                "ok".into()
            }
            Err(e) => {
                log::warn!("Rejected scale command: {}", e);
                format!("error: {}", e)
            }
        },
        _ => format!("error: unknown command '{}'", line),
    }
}
