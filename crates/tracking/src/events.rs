use model::vehicle::Vehicle;
use tokio::{sync::mpsc, task::JoinHandle};
use utility::id::Id;

use crate::{client::Client, database::Database, TrackingError, TrackingResult};

const EVENT_BUFFER: usize = 64;

/// Notifications from the catalogs that affect stored positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    VehicleRemoved(Id<Vehicle>),
}

/// Sending half of the catalog event channel.
#[derive(Debug, Clone)]
pub struct CatalogEvents {
    sender: mpsc::Sender<CatalogEvent>,
}

impl CatalogEvents {
    pub async fn publish(&self, event: CatalogEvent) -> TrackingResult<()> {
        self.sender
            .send(event)
            .await
            .map_err(TrackingError::storage)
    }
}

pub async fn handle<D: Database>(
    client: &Client<D>,
    event: CatalogEvent,
) -> TrackingResult<u64> {
    match event {
        CatalogEvent::VehicleRemoved(vehicle_id) => {
            client.vehicle_removed(&vehicle_id).await
        }
    }
}

/// Spawns the task applying catalog events. It ends once every
/// `CatalogEvents` handle has been dropped.
pub fn spawn<D: Database>(client: Client<D>) -> (CatalogEvents, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<CatalogEvent>(EVENT_BUFFER);
    let task = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if let Err(why) = handle(&client, event.clone()).await {
                log::error!("failed to apply {event:?}: {why}");
            }
        }
        log::debug!("catalog event channel closed");
    });
    (CatalogEvents { sender }, task)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        database::PositionRepo,
        testing::{catalog, raw, server, COLOMBO},
    };

    use super::*;

    #[tokio::test]
    async fn removal_events_cascade_to_reports() {
        let server = server(catalog().await);
        let client = server.client();
        client
            .submit_position(raw("bus-1", COLOMBO, 20.0, 1))
            .await
            .unwrap();
        client
            .submit_position(raw("bus-2", COLOMBO, 20.0, 1))
            .await
            .unwrap();

        let (events, task) = spawn(client.clone());
        events
            .publish(CatalogEvent::VehicleRemoved(Id::from("bus-1")))
            .await
            .unwrap();
        drop(events);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        let mut db = client.database.auto();
        assert!(db.latest_for_vehicle(&Id::from("bus-1")).await.is_err());
        assert!(db.latest_for_vehicle(&Id::from("bus-2")).await.is_ok());
    }
}
