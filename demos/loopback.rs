//! Loopback Example
//!
//! Opens a session, sets 500 kbps, starts the channel and sends one frame,
//! then prints everything received. Pass any argument to run the channel in
//! loopback mode so the sent frame comes straight back as an echo.

use std::time::Duration;

use gs_usb_host::{libusb_version, CanFrame, GsUsbError, Session};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> gs_usb_host::Result<()> {
    println!("libusb version {}", libusb_version());

    let loopback = std::env::args().len() > 1;
    println!("Loopback {}", if loopback { "ENABLED" } else { "DISABLED" });

    let session = Session::new()?;
    if !session.is_connected() {
        println!("Can not find gs_usb device");
        return Ok(());
    }

    session.set_bitrate(500_000)?;
    session.start_channel(loopback)?;

    let data: Vec<u8> = (0..8).collect();
    let frame = CanFrame::new(0x123, &data);
    session.write_frame(&frame, Duration::ZERO)?;
    println!("TX  {}", frame);

    loop {
        match session.read_frame(Duration::from_millis(100)) {
            Ok(frame) => println!("{}", frame),
            Err(GsUsbError::ReadTimeout) => continue,
            Err(GsUsbError::DeviceNotConnected) => {
                println!("Device disconnected");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}
