//! Keymatrix - GPIO key-matrix keyboard daemon
//!
//! Bridges a scanned switch matrix to a virtual Linux input device.
//! Runs until interrupted.

use anyhow::Result;

#[cfg(target_os = "linux")]
fn main() -> Result<()> {
    use anyhow::Context;
    use env_logger::Env;
    use log::info;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use keymatrix::driver::Driver;
    use keymatrix::gpio::SysfsGpio;
    use keymatrix::keyboard::RuleSet;
    use keymatrix::uinput::UinputSink;
    use keymatrix::Config;

    // A path on the command line wins over the default config location
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            Config::load_from(&path)
                .with_context(|| format!("reading config {}", path.display()))?
        }
        None => Config::load()?,
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(&config.log.level)).init();

    let model = config.matrix.model;
    info!(
        "starting {} ({}x{} matrix)",
        config.device_name(),
        config.matrix.row_pins.len(),
        config.matrix.col_pins.len()
    );

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    // Register every key the tables or the substitution rules can produce
    let mut keys = model.layout().emitted_keys();
    keys.extend(RuleSet::for_model(model).emitted_keys());

    let sink = UinputSink::create(&config.device_name(), keys)?;
    let gpio = SysfsGpio::new();

    let mut driver = Driver::new(
        gpio,
        sink,
        model,
        &config.matrix.row_pins,
        &config.matrix.col_pins,
    )?;
    driver.run(&running)?;

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() -> Result<()> {
    anyhow::bail!("keymatrix drives sysfs GPIO and uinput, which require Linux");
}
