//! Facade the transports call into: every HTTP operation and channel frame maps
//! to one method here.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{RideError, RideResult};
use crate::lifecycle::TripLifecycle;
use crate::matching::{Dispatcher, MatchResult, MatchingAlgorithm, NearestFirst, TripTicket};
use crate::model::{Captain, Coordinates, Identity, Role, Trip, TripId, TripRequest};
use crate::notify::{Notifier, TripSnapshot};
use crate::protocol::{
    parse_client_message, ClientMessage, LocationReport, ServerEvent, TripStatusPayload,
};
use crate::registry::{Channel, ConnectionId, ConnectionRegistry, Outbound};
use crate::spatial::{H3LocationIndex, LocationIndex};
use crate::store::{InMemoryTripStore, TripStore};

/// Trip record plus where its captain was last seen; read by polling clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetail {
    #[serde(flatten)]
    pub trip: Trip,
    pub captain_location: Option<Coordinates>,
}

/// A registered real-time channel as seen by its transport.
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    /// Sender for direct replies on this connection, bypassing the registry.
    pub channel: Channel,
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
}

pub struct RideService {
    store: Arc<dyn TripStore>,
    index: Arc<dyn LocationIndex>,
    registry: Arc<ConnectionRegistry>,
    notifier: Arc<Notifier>,
    dispatcher: Arc<Dispatcher>,
    lifecycle: TripLifecycle,
    config: ServiceConfig,
}

impl RideService {
    /// Process-local store and H3 index.
    pub fn in_memory(config: ServiceConfig) -> Self {
        Self::with_backends(
            Arc::new(InMemoryTripStore::new()),
            Arc::new(H3LocationIndex::new(config.index)),
            Box::new(NearestFirst),
            config,
        )
    }

    pub fn with_backends(
        store: Arc<dyn TripStore>,
        index: Arc<dyn LocationIndex>,
        algorithm: Box<dyn MatchingAlgorithm>,
        config: ServiceConfig,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Arc::new(Notifier::new(
            store.clone(),
            index.clone(),
            registry.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            index.clone(),
            notifier.clone(),
            algorithm,
            config.dispatch,
            config.pricing,
        ));
        let lifecycle = TripLifecycle::new(store.clone(), notifier.clone());
        Self {
            store,
            index,
            registry,
            notifier,
            dispatcher,
            lifecycle,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub async fn request_trip(
        &self,
        rider: &Identity,
        request: TripRequest,
    ) -> RideResult<TripTicket> {
        self.dispatcher.request_trip(rider, request).await
    }

    /// Runs one matching pass now, independent of the auto-dispatch setting.
    pub async fn attempt_match(&self, trip_id: TripId) -> RideResult<Option<MatchResult>> {
        self.dispatcher.attempt_match(trip_id).await
    }

    pub async fn accept_trip(&self, trip_id: TripId, captain: &Identity) -> RideResult<Trip> {
        self.lifecycle.accept_manually(trip_id, captain).await
    }

    pub async fn verify_pickup(
        &self,
        trip_id: TripId,
        captain: &Identity,
        otp: &str,
    ) -> RideResult<Trip> {
        self.lifecycle.verify_pickup(trip_id, captain, otp).await
    }

    pub async fn complete_trip(&self, trip_id: TripId, captain: &Identity) -> RideResult<Trip> {
        self.lifecycle.complete(trip_id, captain).await
    }

    pub async fn cancel_trip(&self, trip_id: TripId, actor: &Identity) -> RideResult<Trip> {
        self.lifecycle.cancel(trip_id, actor).await
    }

    /// Open trips any captain may try to accept, oldest first.
    pub async fn list_available_trips(&self, captain: &Identity) -> RideResult<Vec<Trip>> {
        captain.require(Role::Captain)?;
        Ok(self.store.open_trips().await?)
    }

    /// Pooling report: the captain is online, looking for work, and at `at`.
    pub async fn report_location(&self, captain: &Identity, at: Coordinates) -> RideResult<Captain> {
        captain.require(Role::Captain)?;
        at.validate()?;
        self.index.upsert_location(&captain.id, at).await?;
        let row = self.store.mark_pooling(&captain.id, at).await?;
        debug!(
            captain_id = %captain.id,
            pooling = row.pooling_for_work,
            assigned = row.assigned_to_trip,
            "pooling location"
        );
        Ok(row)
    }

    /// Live report during a trip: indexed and relayed to the rider. Flags are
    /// left alone.
    pub async fn report_trip_location(
        &self,
        captain: &Identity,
        trip_id: TripId,
        at: Coordinates,
    ) -> RideResult<()> {
        captain.require(Role::Captain)?;
        at.validate()?;
        self.index.upsert_location(&captain.id, at).await?;
        self.notifier.publish_location(trip_id, captain, at).await
    }

    pub async fn captain(&self, captain_id: &str) -> RideResult<Option<Captain>> {
        Ok(self.store.captain(captain_id).await?)
    }

    /// Caller's trips as rider or captain, newest first.
    pub async fn trip_history(&self, identity: &Identity) -> RideResult<Vec<Trip>> {
        Ok(self.store.trips_for(identity).await?)
    }

    pub async fn trip_detail(&self, trip_id: TripId, identity: &Identity) -> RideResult<TripDetail> {
        let trip = self
            .store
            .trip(trip_id)
            .await?
            .ok_or_else(|| RideError::NotFound(format!("trip {trip_id}")))?;
        if !trip.is_party(identity) {
            return Err(RideError::Unauthorized(format!(
                "{identity} is not a party to trip {trip_id}"
            )));
        }
        let captain_location = match trip.captain_id.as_deref() {
            Some(captain_id) => self.notifier.captain_location(captain_id).await,
            None => None,
        };
        Ok(TripDetail {
            trip,
            captain_location,
        })
    }

    pub async fn subscribe(&self, trip_id: TripId, identity: &Identity) -> RideResult<TripSnapshot> {
        self.notifier.subscribe(trip_id, identity).await
    }

    /// Registers a fresh channel for `identity`, superseding any previous one.
    pub fn connect(&self, identity: Identity) -> Connection {
        let (channel, outbound) = Channel::open();
        let id = channel.id();
        self.registry.register(identity.clone(), channel.clone());
        info!(%identity, connection_id = %id, "connected");
        Connection {
            id,
            identity,
            channel,
            outbound,
        }
    }

    /// Drops the channel if it is still current. A captain whose current
    /// channel closes goes offline; a superseded channel closing changes nothing.
    pub async fn disconnect(&self, identity: &Identity, connection_id: ConnectionId) -> RideResult<()> {
        if !self.registry.unregister(identity, connection_id) {
            debug!(%identity, %connection_id, "stale channel closed");
            return Ok(());
        }
        info!(%identity, %connection_id, "disconnected");
        if identity.is_captain() {
            let on_trip = self
                .store
                .captain(&identity.id)
                .await?
                .is_some_and(|row| row.assigned_to_trip);
            self.lifecycle.captain_disconnected(&identity.id).await?;
            // The last fix stays visible to the rider of an active trip.
            if !on_trip {
                if let Err(err) = self.index.remove_location(&identity.id).await {
                    warn!(%identity, error = %err, "could not drop offline captain from index");
                }
            }
        }
        Ok(())
    }

    /// Parses and handles one inbound text frame, returning the direct replies.
    pub async fn handle_frame(&self, identity: &Identity, text: &str) -> Vec<ServerEvent> {
        match parse_client_message(text) {
            Ok(message) => self.handle_client_message(identity, message).await,
            Err(err) => {
                debug!(%identity, error = %err, "unparseable frame");
                vec![ServerEvent::error("unknown or malformed message")]
            }
        }
    }

    pub async fn handle_client_message(
        &self,
        identity: &Identity,
        message: ClientMessage,
    ) -> Vec<ServerEvent> {
        match message {
            ClientMessage::SubscribeTrip(payload) => {
                match self.subscribe(payload.trip_id, identity).await {
                    Ok(snapshot) => {
                        let mut replies = vec![ServerEvent::Subscribed(TripStatusPayload {
                            trip_id: snapshot.trip_id,
                            status: snapshot.status,
                        })];
                        if let Some(at) = snapshot.captain_location {
                            replies.push(ServerEvent::location_update(snapshot.trip_id, at));
                        }
                        replies
                    }
                    Err(err) => vec![ServerEvent::error(err.to_string())],
                }
            }
            ClientMessage::SendLocation(report) => {
                match self.handle_location_report(identity, report).await {
                    Ok(()) => Vec::new(),
                    Err(err) => vec![ServerEvent::error(err.to_string())],
                }
            }
        }
    }

    async fn handle_location_report(
        &self,
        identity: &Identity,
        report: LocationReport,
    ) -> RideResult<()> {
        let at = report.coordinates();
        match report.trip_id {
            Some(trip_id) => self.report_trip_location(identity, trip_id, at).await,
            None => self.report_location(identity, at).await.map(|_| ()),
        }
    }
}
