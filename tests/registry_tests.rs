//! Integration tests for resource enumeration and claim bookkeeping.
//!
//! All tests run against the simulated driver; no hardware is needed.

use std::sync::{Arc, Barrier};
use std::thread;
use tlpm_guard::mock::{DriverCall, MockDriver};
use tlpm_guard::{
    Config, ConnectOptions, DiscoveredResource, Error, PowerMeterDriver, Registry, Result,
};

const RESOURCE_A: &str = "USB0::0x1313::0x8078::P0000001::INSTR";
const RESOURCE_B: &str = "USB0::0x1313::0x8072::P0000002::INSTR";

fn two_device_registry() -> Registry<MockDriver> {
    Registry::new(
        MockDriver::new()
            .with_device(RESOURCE_A, "PM100D", "P0000001")
            .with_device(RESOURCE_B, "PM100USB", "P0000002"),
    )
}

#[test]
fn test_enumerate_in_driver_order() -> Result<()> {
    let registry = two_device_registry();
    let devices = registry.enumerate()?;

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].resource_name, RESOURCE_A);
    assert_eq!(devices[0].model_name, "PM100D");
    assert_eq!(devices[0].manufacturer, "Thorlabs");
    assert_eq!(devices[1].serial_number, "P0000002");
    assert!(devices.iter().all(|d| d.available));
    assert_eq!(registry.driver().calls(), vec![DriverCall::Discover]);
    Ok(())
}

#[test]
fn test_enumerate_empty() -> Result<()> {
    let registry = Registry::new(MockDriver::new());
    assert!(registry.enumerate()?.is_empty());
    Ok(())
}

#[test]
fn test_connected_resource_shows_unavailable() -> Result<()> {
    let registry = two_device_registry();
    let devices = registry.enumerate()?;

    let mut session = registry.session();
    session.connect(&devices[0], ConnectOptions::default())?;

    let refreshed = registry.enumerate()?;
    assert!(!refreshed[0].available);
    assert!(refreshed[1].available);
    // The earlier snapshot is not refreshed
    assert!(devices[0].available);

    let _ = session.disconnect();
    assert!(registry.enumerate()?[0].available);
    Ok(())
}

#[test]
fn test_double_claim_rejected_but_force_connects() -> Result<()> {
    let registry = two_device_registry();
    let device = registry.find_by_index(0)?;

    assert!(registry.mark_claimed(&device));
    assert!(!registry.mark_claimed(&device));
    assert!(registry.is_claimed(RESOURCE_A));

    let mut session = registry.session();
    match session.connect(&device, ConnectOptions::default()) {
        Err(Error::AlreadyClaimed { resource }) => assert_eq!(resource, RESOURCE_A),
        other => panic!("Expected AlreadyClaimed error, got: {:?}", other),
    }
    assert!(!registry
        .driver()
        .calls()
        .iter()
        .any(|c| matches!(c, DriverCall::Open { .. })));

    session.connect_force(&device, ConnectOptions::default())?;
    assert!(session.is_connected());

    // The forced session did not take the claim, so it leaves it in place
    let _ = session.disconnect();
    assert!(registry.is_claimed(RESOURCE_A));
    assert!(registry.mark_released(&device));
    assert!(!registry.is_claimed(RESOURCE_A));
    Ok(())
}

#[test]
fn test_driver_reported_busy_device() -> Result<()> {
    let registry = Registry::new(MockDriver::new().with_resource(DiscoveredResource {
        resource_name: RESOURCE_A.to_string(),
        model_name: "PM400".to_string(),
        serial_number: "P0000001".to_string(),
        manufacturer: "Thorlabs".to_string(),
        available: false,
    }));
    let device = registry.find_by_serial("P0000001")?;
    assert!(!device.available);

    let mut session = registry.session();
    assert!(matches!(
        session.connect(&device, ConnectOptions::default()),
        Err(Error::AlreadyClaimed { .. })
    ));

    session.connect_force(&device, ConnectOptions::default())?;
    assert!(registry.is_claimed(RESOURCE_A));
    let _ = session.disconnect();
    assert!(!registry.is_claimed(RESOURCE_A));
    Ok(())
}

#[test]
fn test_find_by_serial_nonexistent() {
    let registry = two_device_registry();
    match registry.find_by_serial("DEFINITELY_NONEXISTENT") {
        Err(Error::DeviceNotFoundBySerial { serial, message }) => {
            assert_eq!(serial, "DEFINITELY_NONEXISTENT");
            assert!(message.contains("No power meter found"));
        }
        other => panic!("Expected DeviceNotFoundBySerial error, got: {:?}", other),
    }
}

#[test]
fn test_find_by_index_out_of_range() {
    let registry = two_device_registry();
    match registry.find_by_index(12) {
        Err(Error::DeviceNotFoundByIndex { index, message }) => {
            assert_eq!(index, 12);
            assert!(message.contains("out of range"));
        }
        other => panic!("Expected DeviceNotFoundByIndex error, got: {:?}", other),
    }
}

#[test]
fn test_from_config_loads_driver_once() -> Result<()> {
    let config = Config::from_toml_str(
        r#"
        [driver]
        binary_name = "Thorlabs.TLPM_32.Interop.dll"

        [session]
        dark_adjust_timeout_ms = 2000
        "#,
    )?;
    let registry = Registry::<MockDriver>::from_config(&config)?;

    let loaded = registry.driver().loaded_config().expect("driver not loaded from config");
    assert_eq!(loaded.binary_name, "Thorlabs.TLPM_32.Interop.dll");
    assert_eq!(registry.session_config().dark_adjust_timeout_ms, 2000);

    // Sessions share the registry's driver instance
    let devices = registry.enumerate()?;
    let mut session = registry.session();
    session.connect_default(&devices[0])?;
    assert_eq!(registry.driver().open_handle_count(), 1);
    let _ = session.disconnect();
    assert_eq!(registry.driver().open_handle_count(), 0);
    Ok(())
}

#[test]
fn test_connect_default_uses_configured_options() -> Result<()> {
    let mut config = Config::default();
    config.session.connect.reset_device = true;
    config.session.connect.id_query = false;
    let registry = Registry::with_session_config(
        MockDriver::load(&config.driver)?,
        config.session.clone(),
    );

    let device = registry.find_by_index(0)?;
    let mut session = registry.session();
    session.connect_default(&device)?;
    assert!(registry.driver().calls().contains(&DriverCall::Open {
        resource_name: device.resource_name.clone(),
        id_query: false,
        reset: true,
    }));
    Ok(())
}

#[test]
fn test_sessions_on_separate_threads() -> Result<()> {
    let registry = two_device_registry();
    let devices = registry.enumerate()?;

    let handles: Vec<_> = devices
        .into_iter()
        .map(|device| {
            let registry = registry.clone();
            thread::spawn(move || -> Result<f64> {
                let mut session = registry.session();
                session.connect(&device, ConnectOptions::default())?;
                let power = session.read_power()?;
                let _ = session.disconnect();
                Ok(power.value)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().expect("session thread panicked");
        assert!(result.is_ok());
    }
    assert!(!registry.is_claimed(RESOURCE_A));
    assert!(!registry.is_claimed(RESOURCE_B));
    assert_eq!(registry.driver().open_handle_count(), 0);
    Ok(())
}

#[test]
fn test_concurrent_connects_to_one_device() -> Result<()> {
    let registry = two_device_registry();
    let device = registry.find_by_index(0)?;
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let registry = registry.clone();
            let device = device.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut session = registry.session();
                barrier.wait();
                let result = session.connect(&device, ConnectOptions::default());
                // Keep the winner connected until both threads have tried
                barrier.wait();
                result
            })
        })
        .collect();

    let results: Vec<Result<()>> = handles
        .into_iter()
        .map(|h| h.join().expect("session thread panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let rejected: Vec<&Error> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    match rejected.as_slice() {
        [Error::AlreadyClaimed { resource }] => assert_eq!(resource, RESOURCE_A),
        other => panic!("Expected one AlreadyClaimed error, got: {:?}", other),
    }

    // Both sessions are gone, so the winner's claim and handle were released
    assert!(!registry.is_claimed(RESOURCE_A));
    assert_eq!(registry.driver().open_handle_count(), 0);
    let opens = registry
        .driver()
        .calls()
        .iter()
        .filter(|c| matches!(c, DriverCall::Open { .. }))
        .count();
    assert_eq!(opens, 1);
    Ok(())
}
