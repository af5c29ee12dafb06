//! Demonstration of LoadingStrategy mirroring a store into a render layer

use entwine::{
    EntityKey, EntityState, Focus, LoadingOptions, LoadingStrategy, Revisioned, Store,
    StoreOptions, Surface, SyncTarget,
};

#[derive(Clone, Debug, PartialEq)]
struct Station {
    id: u32,
    name: String,
    revision: u32,
}

#[derive(Clone, Debug, PartialEq)]
struct Marker {
    station: u32,
    label: String,
    revision: u32,
}

impl Revisioned for Marker {
    type Revision = u32;

    fn key(&self) -> EntityKey {
        EntityKey::from(self.station)
    }

    fn revision(&self) -> u32 {
        self.revision
    }
}

/// An in-memory stand-in for a map layer.
#[derive(Default)]
struct MarkerLayer {
    markers: Vec<Marker>,
}

impl SyncTarget for MarkerLayer {
    type Element = Marker;

    fn elements(&self) -> Vec<Marker> {
        self.markers.clone()
    }

    fn add_elements(&mut self, elements: &[Marker]) {
        for marker in elements {
            println!("   + {}", marker.label);
        }
        self.markers.extend_from_slice(elements);
    }

    fn remove_elements(&mut self, elements: &[Marker]) {
        for marker in elements {
            println!("   - {}", marker.label);
        }
        self.markers.retain(|marker| !elements.contains(marker));
    }

    fn focus(&mut self, elements: &[Marker], focus: &Focus) {
        println!("   focus {} marker(s) with {:?}", elements.len(), focus.motion);
    }
}

fn station(id: u32, name: &str, revision: u32) -> Station {
    Station {
        id,
        name: name.to_string(),
        revision,
    }
}

fn main() {
    println!("=== Loading Strategy Example: Map Layer ===\n");

    let stations: Store<Station> = Store::new(
        vec![station(1, "North", 1), station(2, "South", 1)],
        StoreOptions::new(|station: &Station| EntityKey::from(station.id)),
    );

    let loading: LoadingStrategy<Station, EntityState, MarkerLayer> = LoadingStrategy::new(
        LoadingOptions {
            area_ratio: Some(0.004),
            ..Default::default()
        },
        |station: &Station| Marker {
            station: station.id,
            label: station.name.clone(),
            revision: station.revision,
        },
    );

    let layer = Surface::new(MarkerLayer::default());
    loading.attach(&stations, layer.clone());

    println!("1. Activating the strategy");
    if let Err(error) = stations.add_strategy(&loading, true) {
        println!("   could not add strategy: {}", error);
        return;
    }

    println!("\n2. Adding a station");
    stations.insert(station(3, "East", 1));

    println!("\n3. Renaming a station");
    stations.update(station(1, "North Gate", 2));

    println!("\n4. Hiding the south station");
    stations.data_view().filter(|station| station.id != 2);

    println!("\n5. Adding the strategy twice fails");
    if let Err(error) = stations.add_strategy(&loading, true) {
        println!("   {}", error);
    }

    println!("\n6. Deactivating, then changing the store");
    loading.deactivate();
    stations.delete_by_key(&EntityKey::from(3u32));
    let markers = layer.with_target(|layer| layer.markers.len()).unwrap_or_default();
    println!("   layer still holds {} marker(s)", markers);

    println!("\n✓ Example complete!");
}
