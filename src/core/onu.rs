//! ONU monitoring - optical readings for fiber customers.

use crate::{
    core::{
        customer::get_scoped_customer,
        policy::{Actor, Capability},
    },
    entities::{OnuStatus, onu_status},
    errors::{Error, Result},
    models::{OnuState, SignalQuality},
};
use async_trait::async_trait;
use rand::Rng;
use sea_orm::{QueryOrder, Set, TryIntoModel, prelude::*};
use std::time::Duration;
use tracing::{info, instrument};

/// Received power below which an answering unit is reported as loss of signal.
const LOS_THRESHOLD_DBM: f64 = -28.0;

/// One reading taken from an optical unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnuReading {
    pub state: OnuState,
    /// dBm
    pub rx_power: f64,
    /// dBm
    pub tx_power: f64,
    /// °C
    pub temperature: f64,
    /// meters
    pub distance: i32,
}

/// Source of optical unit telemetry.
#[async_trait]
pub trait OnuProbe: Send + Sync {
    async fn read(&self, onu_id: &str) -> Result<OnuReading>;
}

/// Probe that fabricates plausible readings after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedOnuProbe {
    delay: Duration,
}

impl SimulatedOnuProbe {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedOnuProbe {
    fn default() -> Self {
        Self::new(Duration::from_millis(800))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl OnuProbe for SimulatedOnuProbe {
    async fn read(&self, _onu_id: &str) -> Result<OnuReading> {
        tokio::time::sleep(self.delay).await;

        let mut rng = rand::thread_rng();
        let online = rng.gen_bool(0.8);
        let (rx_power, tx_power) = if online {
            (
                round2(-rng.gen_range(15.0..25.0)),
                round2(rng.gen_range(1.0..4.0)),
            )
        } else {
            (-40.0, 0.0)
        };
        let state = match (online, rx_power < LOS_THRESHOLD_DBM) {
            (false, _) => OnuState::Offline,
            (true, true) => OnuState::Los,
            (true, false) => OnuState::Online,
        };

        Ok(OnuReading {
            state,
            rx_power,
            tx_power,
            temperature: f64::from(rng.gen_range(35_u8..55)),
            distance: rng.gen_range(100..10_100),
        })
    }
}

/// Buckets a received power level.
#[must_use]
pub fn signal_quality(rx_power: f64) -> SignalQuality {
    if rx_power >= -20.0 {
        SignalQuality::Excellent
    } else if rx_power >= -23.0 {
        SignalQuality::Good
    } else if rx_power >= -27.0 {
        SignalQuality::Fair
    } else if rx_power >= -30.0 {
        SignalQuality::Poor
    } else {
        SignalQuality::Critical
    }
}

/// Reads a customer's unit and stores the reading, replacing the previous one.
#[instrument(skip(db, probe, actor))]
pub async fn check_onu_status(
    db: &DatabaseConnection,
    probe: &dyn OnuProbe,
    actor: &Actor,
    customer_id: i64,
) -> Result<onu_status::Model> {
    actor.require(Capability::ViewCustomers)?;
    let customer = get_scoped_customer(db, actor, customer_id).await?;
    let onu_id = customer
        .onu_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| Error::Validation {
            message: format!("customer '{}' has no ONU assigned", customer.username),
        })?;

    let reading = probe.read(&onu_id).await?;

    let mut active_model: onu_status::ActiveModel = match get_onu_by_onu_id(db, &onu_id).await? {
        Some(existing) => existing.into(),
        None => onu_status::ActiveModel {
            onu_id: Set(onu_id.clone()),
            ..Default::default()
        },
    };
    active_model.customer_id = Set(customer.id);
    active_model.status = Set(reading.state.as_str().to_string());
    active_model.rx_power = Set(reading.rx_power);
    active_model.tx_power = Set(reading.tx_power);
    active_model.temperature = Set(reading.temperature);
    active_model.distance = Set(reading.distance);
    active_model.last_update = Set(chrono::Utc::now());

    let stored = active_model.save(db).await?.try_into_model()?;
    info!(onu_id, state = %reading.state, rx = reading.rx_power, "Checked ONU");
    Ok(stored)
}

pub async fn get_all_onu_status(db: &DatabaseConnection) -> Result<Vec<onu_status::Model>> {
    OnuStatus::find()
        .order_by_desc(onu_status::Column::LastUpdate)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_customer_onu(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<Option<onu_status::Model>> {
    OnuStatus::find()
        .filter(onu_status::Column::CustomerId.eq(customer_id))
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn get_onu_by_onu_id(
    db: &DatabaseConnection,
    onu_id: &str,
) -> Result<Option<onu_status::Model>> {
    OnuStatus::find()
        .filter(onu_status::Column::OnuId.eq(onu_id))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_signal_quality_thresholds() {
        assert_eq!(signal_quality(-15.0), SignalQuality::Excellent);
        assert_eq!(signal_quality(-20.0), SignalQuality::Excellent);
        assert_eq!(signal_quality(-20.01), SignalQuality::Good);
        assert_eq!(signal_quality(-23.0), SignalQuality::Good);
        assert_eq!(signal_quality(-25.0), SignalQuality::Fair);
        assert_eq!(signal_quality(-27.0), SignalQuality::Fair);
        assert_eq!(signal_quality(-29.5), SignalQuality::Poor);
        assert_eq!(signal_quality(-30.0), SignalQuality::Poor);
        assert_eq!(signal_quality(-30.5), SignalQuality::Critical);
        assert_eq!(signal_quality(-40.0), SignalQuality::Critical);
    }

    #[tokio::test]
    async fn test_simulated_readings_are_in_range() -> Result<()> {
        let probe = SimulatedOnuProbe::new(Duration::ZERO);
        for _ in 0..20 {
            let reading = probe.read("ONU-1").await?;
            match reading.state {
                OnuState::Online => {
                    assert!((-25.0..=-15.0).contains(&reading.rx_power));
                    assert!((1.0..=4.0).contains(&reading.tx_power));
                }
                OnuState::Offline => {
                    assert_eq!(reading.rx_power, -40.0);
                    assert_eq!(reading.tx_power, 0.0);
                }
                OnuState::Los | OnuState::DyingGasp => panic!("unexpected {}", reading.state),
            }
            assert!((35.0..55.0).contains(&reading.temperature));
            assert!((100..10_100).contains(&reading.distance));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_check_upserts_one_row_per_onu() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Fiber", 300.0, 30).await?;
        let customer = create_test_customer_with_onu(&db, "alice", &package, "ONU-7").await?;
        let probe = FakeOnuProbe::new(-21.5);

        let first = check_onu_status(&db, &probe, &admin, customer.id).await?;
        assert_eq!(first.status, "online");
        assert_eq!(first.rx_power, -21.5);

        probe.set_rx_power(-31.0).await;
        let second = check_onu_status(&db, &probe, &admin, customer.id).await?;
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, "los");

        assert_eq!(get_all_onu_status(&db).await?.len(), 1);
        assert_eq!(
            get_customer_onu(&db, customer.id).await?.unwrap().rx_power,
            -31.0
        );
        assert!(get_onu_by_onu_id(&db, "ONU-7").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_check_requires_onu_id() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "bob", &package, 10.0).await?;

        let result =
            check_onu_status(&db, &FakeOnuProbe::new(-20.0), &admin, customer.id).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}
