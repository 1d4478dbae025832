use std::env;
use std::time::Duration;
use tlpm_guard::{mock::MockDriver, Config, ConnectOptions, Registry, Result, Warning};

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        println!("  warning: {}", warning);
    }
}

fn main() -> Result<()> {
    env_logger::init();

    // Optional config file as the first argument, defaults otherwise
    let config = match env::args().nth(1) {
        Some(path) => {
            println!("Loading configuration from {}", path);
            Config::load(path)?
        }
        None => Config::default(),
    };
    println!("Driver binary: {}", config.driver.binary_path().display());

    // The simulated driver stands in for the vendor library here
    let registry = Registry::<MockDriver>::from_config(&config)?;

    // --- Discovery ---
    let devices = registry.enumerate()?;
    if devices.is_empty() {
        println!("No power meters found.");
        return Ok(());
    }
    println!("Found {} power meter(s):", devices.len());
    for (i, d) in devices.iter().enumerate() {
        println!(
            "  {}: {} {} SN {} at {} ({})",
            i,
            d.manufacturer,
            d.model_name,
            d.serial_number,
            d.resource_name,
            if d.available { "available" } else { "in use" }
        );
    }

    // --- Connect ---
    let mut meter = registry.session();
    meter.connect_default(&devices[0])?;
    println!("Connected: {}", meter.state());

    // A second session on the same device is refused
    let mut other = registry.session();
    if let Err(e) = other.connect(&devices[0], ConnectOptions::default()) {
        println!("Second session refused: {}", e);
    }

    // --- Settings ---
    for nm in [50.0, 635.0, 2000.0] {
        let outcome = meter.set_wavelength(nm)?;
        println!(
            "Requested {} nm, applied {} nm ({})",
            nm, outcome.value.applied, outcome.value.clamp
        );
        print_warnings(&outcome.warnings);
    }

    let outcome = meter.set_attenuation(3.0)?;
    print_warnings(&outcome.warnings);
    let outcome = meter.set_brightness(1.5)?;
    print_warnings(&outcome.warnings);
    meter.set_timeout(Duration::from_secs(2))?;
    meter.set_power_auto_range(true)?;
    println!("Settings: {:?}", meter.settings());

    // --- Measurements ---
    let outcome = meter.read_power_and_voltage()?;
    println!("Power: {}", outcome.value.power);
    match outcome.value.voltage {
        Some(v) => println!("Voltage: {}", v),
        None => print_warnings(&outcome.warnings),
    }

    let sensor = meter.sensor_info()?;
    let head = &sensor.value;
    println!(
        "Sensor {} (SN {}), {}: {}",
        head.name,
        head.serial_number,
        head.calibration_message,
        head.subtype_label()
    );
    println!("  flags: {}", head.flag_labels().join(", "));
    print_warnings(&sensor.warnings);

    // --- Dark adjustment (PM400 only) ---
    let outcome = meter.dark_adjust()?;
    print_warnings(&outcome.warnings);
    if let Some(offset) = meter.read_dark_offset()?.value {
        println!("Dark offset: {}", offset);
    }

    // --- Disconnect ---
    let outcome = meter.disconnect();
    print_warnings(&outcome.warnings);
    println!("Disconnected: {}", meter.state());
    Ok(())
}
