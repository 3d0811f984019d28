//! Startup sequence that captures the device's baseline response

use mcusweep_proto::{CommandId, Frame};

use crate::error::{hex, SweepError};
use crate::link::{round_trip, Connection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingHeartbeat,
    AwaitingMcuInfo,
    AwaitingWorkingMode,
    BaselineCaptured,
}

/// Raw responses collected during the handshake
///
/// Only `response` matters to the sweep; the others are kept for the
/// operator's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub heartbeat: Vec<u8>,
    pub mcu_info: Vec<u8>,
    pub working_mode: Vec<u8>,
    /// Read taken after the working-mode exchange; every sweep response is
    /// compared against it
    pub response: Vec<u8>,
}

/// Drives heartbeat, MCU info and working mode queries, then one extra read
///
/// Any transport error aborts the handshake: a half-finished exchange leaves
/// no trustworthy baseline.
#[derive(Debug)]
pub struct HandshakeSequencer {
    state: HandshakeState,
    strict: bool,
}

impl HandshakeSequencer {
    /// With `strict`, a response that does not parse as a frame is fatal
    pub fn new(strict: bool) -> Self {
        Self { state: HandshakeState::Idle, strict }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub async fn run<C: Connection>(&mut self, conn: &mut C) -> Result<Baseline, SweepError> {
        self.state = HandshakeState::AwaitingHeartbeat;
        let heartbeat = self.query(conn, CommandId::HEARTBEAT).await?;

        self.state = HandshakeState::AwaitingMcuInfo;
        let mcu_info = self.query(conn, CommandId::MCU_INFO).await?;

        self.state = HandshakeState::AwaitingWorkingMode;
        let working_mode = self.query(conn, CommandId::WORKING_MODE).await?;

        let response = conn.read().await.map_err(|source| SweepError::TransportRead {
            frame: "<baseline read>".to_string(),
            source,
        })?;
        self.state = HandshakeState::BaselineCaptured;
        tracing::info!(baseline = %hex(&response), "baseline captured");

        Ok(Baseline { heartbeat, mcu_info, working_mode, response })
    }

    async fn query<C: Connection>(
        &mut self,
        conn: &mut C,
        command: CommandId,
    ) -> Result<Vec<u8>, SweepError> {
        let frame = Frame::query(command).to_bytes().map_err(SweepError::Encode)?;
        tracing::info!(%command, frame = %hex(&frame), "sending handshake query");

        let response = round_trip(conn, &frame).await?;
        self.inspect(command, &response)?;
        Ok(response)
    }

    fn inspect(&self, command: CommandId, response: &[u8]) -> Result<(), SweepError> {
        match Frame::from_bytes(response) {
            Ok(frame) => {
                tracing::info!(
                    query = %command,
                    reply = %frame.command,
                    payload = %hex(&frame.payload),
                    "handshake response"
                );
                Ok(())
            }
            Err(source) if self.strict => Err(SweepError::MalformedFrame {
                bytes: hex(response),
                source,
            }),
            Err(error) => {
                tracing::warn!(
                    query = %command,
                    response = %hex(response),
                    %error,
                    "handshake response is not a frame"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use futures::executor::block_on;
    use mcusweep_proto::encode;

    use super::*;
    use crate::link::LinkError;

    #[derive(Default)]
    struct Script {
        written: Vec<Vec<u8>>,
        replies: VecDeque<Result<Vec<u8>, LinkError>>,
        fail_write_at: Option<usize>,
    }

    impl Connection for Script {
        async fn write(&mut self, frame: &[u8]) -> Result<(), LinkError> {
            if self.fail_write_at == Some(self.written.len()) {
                return Err(LinkError::Other("write rejected".into()));
            }
            self.written.push(frame.to_vec());
            Ok(())
        }

        async fn read(&mut self) -> Result<Vec<u8>, LinkError> {
            self.replies.pop_front().unwrap_or(Err(LinkError::Closed))
        }

        async fn close(&mut self) -> Result<(), LinkError> {
            Ok(())
        }
    }

    fn reply(command: CommandId, payload: &[u8]) -> Result<Vec<u8>, LinkError> {
        Ok(encode(command, payload).unwrap())
    }

    #[test]
    fn sends_three_queries_then_reads_baseline() {
        let mut conn = Script {
            replies: VecDeque::from([
                reply(CommandId::HEARTBEAT, &[0x01]),
                reply(CommandId::MCU_INFO, b"1.0.0"),
                reply(CommandId::WORKING_MODE, &[]),
                Ok(vec![0xDE, 0xAD]),
            ]),
            ..Default::default()
        };

        let mut handshake = HandshakeSequencer::new(false);
        let baseline = block_on(handshake.run(&mut conn)).unwrap();

        assert_eq!(handshake.state(), HandshakeState::BaselineCaptured);
        assert_eq!(
            conn.written,
            vec![
                vec![0x55, 0xAA, 0x00, 0x00, 0x00, 0xFF],
                vec![0x55, 0xAA, 0x01, 0x00, 0x00, 0x00],
                vec![0x55, 0xAA, 0x02, 0x00, 0x00, 0x01],
            ]
        );
        assert_eq!(baseline.response, vec![0xDE, 0xAD]);
        assert_eq!(baseline.mcu_info, encode(CommandId::MCU_INFO, b"1.0.0").unwrap());
    }

    #[test]
    fn read_error_stops_in_place() {
        let mut conn = Script {
            replies: VecDeque::from([
                reply(CommandId::HEARTBEAT, &[]),
                Err(LinkError::Timeout),
            ]),
            ..Default::default()
        };

        let mut handshake = HandshakeSequencer::new(false);
        let err = block_on(handshake.run(&mut conn)).unwrap_err();

        assert!(matches!(err, SweepError::TransportRead { source: LinkError::Timeout, .. }));
        assert_eq!(handshake.state(), HandshakeState::AwaitingMcuInfo);
        assert_eq!(conn.written.len(), 2);
    }

    #[test]
    fn write_error_is_fatal() {
        let mut conn = Script { fail_write_at: Some(0), ..Default::default() };
        let mut handshake = HandshakeSequencer::new(false);
        let err = block_on(handshake.run(&mut conn)).unwrap_err();
        assert!(matches!(err, SweepError::TransportWrite { .. }));
        assert_eq!(handshake.state(), HandshakeState::AwaitingHeartbeat);
    }

    #[test]
    fn unframed_responses_are_tolerated_unless_strict() {
        let replies = || {
            VecDeque::from([
                Ok(vec![0x01]),
                Ok(vec![0x02]),
                Ok(vec![0x03]),
                Ok(vec![0x04]),
            ])
        };

        let mut lenient = Script { replies: replies(), ..Default::default() };
        let baseline = block_on(HandshakeSequencer::new(false).run(&mut lenient)).unwrap();
        assert_eq!(baseline.response, vec![0x04]);

        let mut strict = Script { replies: replies(), ..Default::default() };
        let err = block_on(HandshakeSequencer::new(true).run(&mut strict)).unwrap_err();
        assert!(matches!(err, SweepError::MalformedFrame { .. }));
        assert_eq!(strict.written.len(), 1);
    }
}
