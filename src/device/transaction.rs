//! Read-modify-write transactions against the control report.
//!
//! Every change fetches the full control report, patches one field,
//! recomputes the checksum and writes the report back, followed by the
//! companion report. A single mutex per device serializes transactions and
//! read-only fetches. No control block outlives its transaction, so changes
//! made by other software between transactions are never overwritten with
//! stale data.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::error::{D5NextError, Result};
use crate::device::transport::{ReportDirection, Transport};
use crate::protocol::{
    CONTROL_REPORT_ID, CONTROL_REPORT_SIZE, ControlBlock, ControlChannel, ControlField,
    SECONDARY_STATUS_REPORT, SECONDARY_STATUS_REPORT_ID,
};

/// Where the current (or last) transaction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Fetching,
    Mutating,
    Writing,
    /// The last transaction aborted; the next one starts with a fresh fetch.
    Failed,
}

struct Session<T> {
    transport: T,
    state: TransactionState,
}

impl<T: Transport> Session<T> {
    fn enter(&mut self, state: TransactionState) {
        debug!("Control transaction: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn fetch(&mut self) -> Result<ControlBlock> {
        self.enter(TransactionState::Fetching);
        let mut buf = [0u8; CONTROL_REPORT_SIZE];
        let read = self
            .transport
            .request(CONTROL_REPORT_ID, ReportDirection::Get, &mut buf)?;
        if read < CONTROL_REPORT_SIZE {
            return Err(D5NextError::Transport {
                report_id: CONTROL_REPORT_ID,
                message: format!(
                    "returned {} bytes, expected {}",
                    read, CONTROL_REPORT_SIZE
                ),
            });
        }

        let block = ControlBlock::decode(&buf)?;
        if !block.is_checksum_valid() {
            // Only logged: the checksum is recomputed before any write.
            warn!("Control report checksum mismatch ({:#06x})", block.checksum);
        }
        Ok(block)
    }

    fn write_back(&mut self, block: &mut ControlBlock) -> Result<()> {
        self.enter(TransactionState::Writing);
        let mut report = block.encode_sealed();
        self.transport
            .request(CONTROL_REPORT_ID, ReportDirection::Set, &mut report)?;

        let mut companion = SECONDARY_STATUS_REPORT;
        self.transport.request(
            SECONDARY_STATUS_REPORT_ID,
            ReportDirection::Set,
            &mut companion,
        )?;
        Ok(())
    }

    /// Record the outcome of a transaction.
    fn finish<R>(&mut self, result: Result<R>) -> Result<R> {
        match &result {
            Ok(_) => self.enter(TransactionState::Idle),
            Err(e) => {
                debug!("Control transaction aborted: {}", e);
                self.enter(TransactionState::Failed);
            }
        }
        result
    }
}

/// Serialized access to the control report of one device.
pub struct ControlTransactions<T> {
    session: Mutex<Session<T>>,
}

impl<T: Transport> ControlTransactions<T> {
    pub fn new(transport: T) -> Self {
        Self {
            session: Mutex::new(Session {
                transport,
                state: TransactionState::Idle,
            }),
        }
    }

    // Every transaction re-fetches, so a panic mid-transaction leaves nothing
    // to repair.
    fn lock(&self) -> MutexGuard<'_, Session<T>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State of the current or last transaction.
    pub fn state(&self) -> TransactionState {
        self.lock().state
    }

    /// Fetch a fresh copy of the whole control block.
    pub fn fetch_block(&self) -> Result<ControlBlock> {
        let mut session = self.lock();
        let result = session.fetch();
        session.finish(result)
    }

    /// Fetch a fresh control block and read one field from it.
    pub fn read_field(&self, channel: ControlChannel, field: ControlField) -> Result<u16> {
        field.check(0)?;
        let mut session = self.lock();
        let result = session
            .fetch()
            .and_then(|block| block.field(channel, field));
        session.finish(result)
    }

    /// Set one field to a raw device value.
    ///
    /// Runs Get(control) -> decode -> patch -> checksum -> Set(control) ->
    /// Set(companion). The value is validated before the device is touched.
    ///
    /// # Errors
    /// `InvalidArgument` for values the field cannot hold, `Transport` if any
    /// exchange fails. No retry is attempted.
    pub fn write_field(&self, channel: ControlChannel, field: ControlField, value: u16) -> Result<()> {
        field.check(value)?;
        let mut session = self.lock();
        debug!("Writing {} = {} on {}", field, value, channel);

        let result = session.fetch().and_then(|mut block| {
            session.enter(TransactionState::Mutating);
            block.set_field(channel, field, value)?;
            session.write_back(&mut block)
        });
        session.finish(result)
    }

    /// Take back the transport.
    pub fn into_inner(self) -> T {
        self.session
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .transport
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use byteorder::{BigEndian, ByteOrder};

    use super::*;
    use crate::device::transport::mock::ScriptedTransport;
    use crate::protocol::checksum;
    use crate::protocol::control::tests::sample_report;
    use crate::protocol::units::normalized_duty_to_device;

    #[test]
    fn test_write_fan_duty_sequence() {
        let transport = ScriptedTransport::new(&sample_report());
        let control = ControlTransactions::new(transport.clone());

        let value = normalized_duty_to_device(128);
        control
            .write_field(ControlChannel::Fan, ControlField::ManualDuty, value)
            .unwrap();
        assert_eq!(control.state(), TransactionState::Idle);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].report_id, CONTROL_REPORT_ID);
        assert_eq!(requests[0].direction, ReportDirection::Get);
        assert_eq!(requests[1].report_id, CONTROL_REPORT_ID);
        assert_eq!(requests[1].direction, ReportDirection::Set);
        assert_eq!(requests[2].report_id, SECONDARY_STATUS_REPORT_ID);
        assert_eq!(requests[2].direction, ReportDirection::Set);
        assert_eq!(requests[2].data, SECONDARY_STATUS_REPORT.to_vec());

        let written: [u8; CONTROL_REPORT_SIZE] = requests[1].data.as_slice().try_into().unwrap();
        assert!(checksum::validate(&written));
        let offset = ControlField::ManualDuty.offset(ControlChannel::Fan).unwrap();
        assert_eq!(BigEndian::read_u16(&written[offset..]), 5020);
    }

    #[test]
    fn test_write_changes_only_target_and_checksum() {
        let original = sample_report();
        let transport = ScriptedTransport::new(&original);
        let control = ControlTransactions::new(transport.clone());
        control
            .write_field(ControlChannel::Pump, ControlField::CurveTemp(5), 4200)
            .unwrap();

        let written = &transport.requests()[1].data;
        let offset = ControlField::CurveTemp(5).offset(ControlChannel::Pump).unwrap();
        let crc = checksum::CHECKSUM_OFFSET;
        for i in 0..CONTROL_REPORT_SIZE {
            if ![offset, offset + 1, crc, crc + 1].contains(&i) {
                assert_eq!(written[i], original[i], "byte {} changed", i);
            }
        }
    }

    #[test]
    fn test_control_set_failure_skips_companion() {
        let transport = ScriptedTransport::new(&sample_report())
            .failing(CONTROL_REPORT_ID, ReportDirection::Set);
        let control = ControlTransactions::new(transport.clone());

        let result = control.write_field(ControlChannel::Fan, ControlField::ManualDuty, 5020);
        assert!(matches!(result, Err(D5NextError::Transport { .. })));
        assert_eq!(control.state(), TransactionState::Failed);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(
            requests
                .iter()
                .all(|r| r.report_id != SECONDARY_STATUS_REPORT_ID)
        );
    }

    #[test]
    fn test_fetch_failure_aborts_before_write() {
        let transport = ScriptedTransport::new(&sample_report())
            .failing(CONTROL_REPORT_ID, ReportDirection::Get);
        let control = ControlTransactions::new(transport.clone());

        let result = control.write_field(ControlChannel::Pump, ControlField::Mode, 1);
        assert!(result.unwrap_err().is_transport());
        assert_eq!(control.state(), TransactionState::Failed);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_invalid_argument_issues_no_request() {
        let transport = ScriptedTransport::new(&sample_report());
        let control = ControlTransactions::new(transport.clone());

        assert!(matches!(
            control.write_field(ControlChannel::Fan, ControlField::Mode, 3),
            Err(D5NextError::InvalidArgument(_))
        ));
        assert!(matches!(
            control.write_field(ControlChannel::Fan, ControlField::CurvePower(16), 0),
            Err(D5NextError::InvalidArgument(_))
        ));
        assert!(control.read_field(ControlChannel::Fan, ControlField::CurveTemp(99)).is_err());
        assert!(transport.requests().is_empty());
        assert_eq!(control.state(), TransactionState::Idle);
    }

    #[test]
    fn test_short_fetch_is_transport_error() {
        let report = sample_report();
        let transport = ScriptedTransport::new(&report[..100]);
        let control = ControlTransactions::new(transport);
        assert!(matches!(
            control.fetch_block(),
            Err(D5NextError::Transport { .. })
        ));
    }

    #[test]
    fn test_every_transaction_refetches() {
        let transport = ScriptedTransport::new(&sample_report());
        let control = ControlTransactions::new(transport.clone());

        control
            .write_field(ControlChannel::Fan, ControlField::ManualDuty, 1000)
            .unwrap();
        assert_eq!(
            control
                .read_field(ControlChannel::Fan, ControlField::ManualDuty)
                .unwrap(),
            1000
        );
        control
            .write_field(ControlChannel::Fan, ControlField::Mode, 2)
            .unwrap();

        let gets = transport
            .requests()
            .iter()
            .filter(|r| r.direction == ReportDirection::Get)
            .count();
        assert_eq!(gets, 3);
    }

    #[test]
    fn test_recovers_after_failure() {
        let transport = ScriptedTransport::new(&sample_report())
            .failing(SECONDARY_STATUS_REPORT_ID, ReportDirection::Set);
        let control = ControlTransactions::new(transport);
        assert!(
            control
                .write_field(ControlChannel::Fan, ControlField::ManualDuty, 10)
                .is_err()
        );
        assert_eq!(control.state(), TransactionState::Failed);

        let mut transport = control.into_inner();
        transport.fail_on = None;
        let control = ControlTransactions::new(transport);
        assert!(control.fetch_block().is_ok());
        assert_eq!(control.state(), TransactionState::Idle);
    }

    #[test]
    fn test_concurrent_writes_are_serialized() {
        let transport = ScriptedTransport::new(&sample_report()).with_delay(Duration::from_millis(2));
        let control = ControlTransactions::new(transport.clone());

        thread::scope(|s| {
            for (channel, base) in [(ControlChannel::Fan, 1000), (ControlChannel::Pump, 2000)] {
                let control = &control;
                s.spawn(move || {
                    for i in 0..5 {
                        control
                            .write_field(channel, ControlField::ManualDuty, base + i)
                            .unwrap();
                    }
                });
            }
        });

        // Each transaction is Get(control), Set(control), Set(companion) with
        // nothing from the other thread in between.
        let requests = transport.requests();
        assert_eq!(requests.len(), 30);
        for exchange in requests.chunks(3) {
            assert_eq!(exchange[0].report_id, CONTROL_REPORT_ID);
            assert_eq!(exchange[0].direction, ReportDirection::Get);
            assert_eq!(exchange[1].report_id, CONTROL_REPORT_ID);
            assert_eq!(exchange[1].direction, ReportDirection::Set);
            assert_eq!(exchange[2].report_id, SECONDARY_STATUS_REPORT_ID);
        }

        // No write was lost to a stale fetch.
        let block = ControlBlock::decode(&control.into_inner().report).unwrap();
        assert_eq!(block.control(ControlChannel::Fan).manual_duty, 1004);
        assert_eq!(block.control(ControlChannel::Pump).manual_duty, 2004);
    }

    #[test]
    fn test_source_passes_through() {
        let transport = ScriptedTransport::new(&sample_report());
        let control = ControlTransactions::new(transport.clone());
        control
            .write_field(ControlChannel::Fan, ControlField::ManualDuty, 42)
            .unwrap();
        let block = ControlBlock::decode(&transport.requests()[1].data).unwrap();
        assert_eq!(block.control(ControlChannel::Pump).source, 7);
    }
}
