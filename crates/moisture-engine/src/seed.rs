//! Example devices created on a fresh start.

use moisture_core::store::DeviceStore;
use moisture_types::{DeviceConfig, NewDevice};
use tracing::info;

/// The example fleet: an office monstera, a living-room fig, and a kitchen
/// cactus tuned for dry soil.
pub fn example_devices() -> Vec<NewDevice> {
    vec![
        NewDevice {
            plant_type: String::from("monstera"),
            location: Some(String::from("Office")),
            initial_moisture: 58.0,
            ..NewDevice::named("Monstera - Office")
        },
        NewDevice {
            plant_type: String::from("ficus"),
            location: Some(String::from("Living Room")),
            initial_moisture: 42.0,
            battery: 86.0,
            ..NewDevice::named("Fiddle Leaf Fig")
        },
        NewDevice {
            plant_type: String::from("cactus"),
            location: Some(String::from("Kitchen")),
            initial_moisture: 22.0,
            battery: 92.0,
            config: Some(DeviceConfig {
                min_threshold: 10.0,
                max_threshold: 35.0,
                evaporation_rate: 0.01,
                irrigation_rate: 0.2,
                noise: 0.2,
                ..DeviceConfig::default()
            }),
            ..NewDevice::named("Cactus")
        },
    ]
}

/// Create the example devices if the store is empty. Returns how many were
/// created.
pub async fn seed_if_empty(store: &DeviceStore) -> usize {
    if !store.list().await.is_empty() {
        return 0;
    }

    let examples = example_devices();
    let count = examples.len();
    for device in examples {
        store.create(device).await;
    }
    info!(devices = count, "Example devices seeded");
    count
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;

    #[test]
    fn examples_are_valid() {
        for device in example_devices() {
            assert!(device.validate().is_ok(), "{} failed validation", device.name);
        }
    }

    #[tokio::test]
    async fn seeds_only_an_empty_store() {
        let store = DeviceStore::with_seed(10, 1);

        assert_eq!(seed_if_empty(&store).await, 3);
        assert_eq!(seed_if_empty(&store).await, 0);

        let devices = store.list().await;
        assert_eq!(devices.len(), 3);
        let cactus = devices.iter().find(|d| d.name == "Cactus");
        assert!(cactus.is_some_and(|d| (d.config.max_threshold - 35.0).abs() < f64::EPSILON));
    }
}
