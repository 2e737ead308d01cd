//! End-to-end exchanges between a session and the simulated slave over an
//! in-memory link, the slave running on its own thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ugvlink_client::{
    ClientError, MoveOutcome, Session, SessionConfig, SessionState, Setpoints, TelemetryKind,
    TelemetryReading,
};
use ugvlink_protocol::{
    DecodeOptions, PipeTransport, RequestCode, Transport, decode_incoming, encode, pipe,
};
use ugvlink_slave::{BatteryStatus, Slave, SlaveConfig, SlaveState};

struct Bench {
    session: Session<PipeTransport>,
    vehicle: SlaveState,
    stop: Arc<AtomicBool>,
    slave: JoinHandle<ugvlink_slave::Result<()>>,
}

fn bench(session_config: SessionConfig, slave_config: SlaveConfig) -> Bench {
    let (master_end, slave_end) = pipe();
    let mut slave = Slave::new(slave_end, slave_config);
    let vehicle = slave.state().clone();
    let stop = Arc::new(AtomicBool::new(false));
    let slave_stop = stop.clone();
    let slave = thread::spawn(move || slave.run(&slave_stop));

    let session = Session::new(master_end, session_config).unwrap();
    Bench {
        session,
        vehicle,
        stop,
        slave,
    }
}

fn default_bench() -> Bench {
    bench(SessionConfig::default(), SlaveConfig::default())
}

#[test]
fn handshake_move_and_stop() {
    let Bench {
        mut session,
        vehicle,
        slave,
        ..
    } = default_bench();

    session.handshake().unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    let outcome = session.move_wheels(Setpoints::new(200, 60)).unwrap();
    assert_eq!(outcome, MoveOutcome::Accepted);
    assert_eq!(vehicle.setpoints(), Some(Setpoints::new(200, 60)));

    assert_eq!(session.shutdown().unwrap(), MoveOutcome::Accepted);
    // link closed with the session; the slave loop ends on its own
    slave.join().unwrap().unwrap();
    assert_eq!(vehicle.setpoints(), Some(Setpoints::NEUTRAL));
    assert_eq!(vehicle.move_count(), 2);
}

#[test]
fn drop_stops_vehicle() {
    let Bench {
        mut session,
        vehicle,
        slave,
        ..
    } = default_bench();

    session.handshake().unwrap();
    session.move_wheels(Setpoints::new(255, 255)).unwrap();
    drop(session);

    slave.join().unwrap().unwrap();
    assert_eq!(vehicle.setpoints(), Some(Setpoints::NEUTRAL));
}

#[test]
fn telemetry_values() {
    let battery = BatteryStatus {
        state_of_charge: 64,
        voltage: 11_800,
        remaining_capacity: 3_000,
        temperature: 31,
        current: 1_200,
    };
    let Bench {
        mut session,
        stop,
        slave,
        ..
    } = bench(
        SessionConfig::default(),
        SlaveConfig {
            battery,
            ..SlaveConfig::default()
        },
    );

    session.handshake().unwrap();
    let readings = session.telemetry_snapshot().unwrap();
    let values: Vec<_> = readings.iter().map(|(_, r)| r.as_u32()).collect();
    assert_eq!(
        values,
        vec![Some(64), Some(11_800), Some(3_000), Some(31), Some(1_200)]
    );
    assert_eq!(
        session.voltage().unwrap(),
        TelemetryReading::Value {
            kind: TelemetryKind::Voltage,
            raw: 11_800u16.to_le_bytes().to_vec()
        }
    );

    stop.store(true, Ordering::Relaxed);
    drop(session);
    slave.join().unwrap().unwrap();
}

#[test]
fn battery_fault_toggles() {
    let Bench {
        mut session,
        vehicle,
        slave,
        ..
    } = default_bench();

    session.handshake().unwrap();
    assert!(session.state_of_charge().unwrap().as_u32().is_some());

    vehicle.set_battery_fault(true);
    assert!(session.state_of_charge().unwrap().is_battery_fault());
    // movement still works during a battery fault
    assert_eq!(
        session.move_wheels(Setpoints::new(140, 140)).unwrap(),
        MoveOutcome::Accepted
    );

    vehicle.set_battery_fault(false);
    assert_eq!(session.current().unwrap().as_u32(), Some(350));

    vehicle.set_battery(BatteryStatus {
        state_of_charge: 12,
        ..vehicle.battery()
    });
    assert_eq!(session.state_of_charge().unwrap().as_u32(), Some(12));

    drop(session);
    slave.join().unwrap().unwrap();
}

#[test]
fn wrong_peer_exhausts_handshake() {
    let Bench {
        mut session,
        vehicle,
        slave,
        ..
    } = bench(
        SessionConfig {
            handshake_attempts: 3,
            ..SessionConfig::for_peer(0x07)
        },
        SlaveConfig::default(),
    );

    let err = session.handshake().unwrap_err();
    assert!(matches!(
        err,
        ClientError::HandshakeExhausted {
            peer_id: 0x07,
            attempts: 3
        }
    ));
    assert_eq!(session.state(), SessionState::Disconnected);

    drop(session);
    slave.join().unwrap().unwrap();
    // the stop on drop went to peer 0x07 as well
    assert_eq!(vehicle.move_count(), 0);
}

#[test]
fn late_answer_does_not_shift_replies() {
    let (master_end, mut vehicle_end) = pipe();
    let peer = thread::spawn(move || {
        let options = DecodeOptions {
            sync_timeout: Duration::from_secs(2),
            ..DecodeOptions::default()
        };
        let ack = encode(0x01, 0x01, 0x01, &[]).unwrap();

        let ready = decode_incoming(&mut vehicle_end, 0x01, &options).unwrap();
        assert_eq!(ready.function_code, RequestCode::Ready.to_byte());
        vehicle_end.write(&ack).unwrap();

        let moved = decode_incoming(&mut vehicle_end, 0x01, &options).unwrap();
        assert_eq!(moved.function_code, RequestCode::Move.to_byte());
        thread::sleep(Duration::from_millis(150));
        vehicle_end.write(&ack).unwrap();

        let query = decode_incoming(&mut vehicle_end, 0x01, &options).unwrap();
        assert_eq!(query.function_code, RequestCode::GetStateOfCharge.to_byte());
        vehicle_end
            .write(&encode(0x01, 0x01, 0x02, &[87]).unwrap())
            .unwrap();
        vehicle_end
    });

    let mut session = Session::new(master_end, SessionConfig::default()).unwrap();
    session.handshake().unwrap();
    assert!(matches!(
        session.move_wheels(Setpoints::new(180, 180)),
        Err(ClientError::NoResponse)
    ));
    // let the late ACK land before the next request goes out
    thread::sleep(Duration::from_millis(150));

    assert_eq!(
        session.state_of_charge().unwrap(),
        TelemetryReading::Value {
            kind: TelemetryKind::StateOfCharge,
            raw: vec![87]
        }
    );

    // keep the peer end open so the drop-time stop is a plain timeout
    let _vehicle_end = peer.join().unwrap();
    drop(session);
}
