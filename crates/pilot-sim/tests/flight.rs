use std::sync::Arc;

use pilot_core::connection::SimConnection;
use pilot_core::dispatch::CommandDispatcher;
use pilot_core::phase::{FlightController, FlightPhase, TICK_PERIOD};
use pilot_core::PilotConfig;
use pilot_sim::{SimAircraftConfig, SimulatedAircraft};

/// Full closed loop against the point-mass model: released from the ramp,
/// taxis, gets handed into the air, climbs under the step law and settles
/// in cruise near the target altitude.
#[tokio::test(start_paused = true)]
async fn parked_to_cruise() {
    let cfg = PilotConfig::default();
    let sim = Arc::new(SimulatedAircraft::new(SimAircraftConfig::default()));
    let dispatcher = Arc::new(CommandDispatcher::new(sim.clone()));
    let controller = FlightController::new(sim.clone(), dispatcher, &cfg);
    let mut phases = controller.subscribe_phase_changes();

    controller.start();
    assert_eq!(phases.recv().await.unwrap(), FlightPhase::Taxi);

    let mut lifted = false;
    for i in 0..6000 {
        tokio::time::sleep(TICK_PERIOD).await;
        sim.step(TICK_PERIOD.as_secs_f64());

        // The rotation the reference operator performed by hand: once the
        // taxi roll is under way, put the aircraft in the air.
        if !lifted && i >= 50 {
            sim.lift_off();
            lifted = true;
        }
        if controller.current_phase() == FlightPhase::Cruise {
            break;
        }
    }

    assert_eq!(controller.current_phase(), FlightPhase::Cruise);

    // Let the law settle around the target.
    for _ in 0..600 {
        tokio::time::sleep(TICK_PERIOD).await;
        sim.step(TICK_PERIOD.as_secs_f64());
    }
    let snap = sim
        .latest_snapshot()
        .expect("simulated aircraft always has telemetry");
    assert!(
        (snap.altitude_ft - 4500.0).abs() < 300.0,
        "cruise should hold within the capture band, at {:.0} ft",
        snap.altitude_ft
    );
    assert!(!snap.on_ground);
    assert!(!snap.parking_brake_on, "taxi releases the parking brake");

    controller.stop();
    assert_eq!(controller.current_phase(), FlightPhase::Idle);
    assert_eq!(phases.recv().await.unwrap(), FlightPhase::Takeoff);
    assert_eq!(phases.recv().await.unwrap(), FlightPhase::Climb);
    assert_eq!(phases.recv().await.unwrap(), FlightPhase::Cruise);
    assert_eq!(phases.recv().await.unwrap(), FlightPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn hold_short_keeps_the_aircraft_parked() {
    let cfg = PilotConfig { hold_short: true, ..PilotConfig::default() };
    let sim = Arc::new(SimulatedAircraft::new(SimAircraftConfig::default()));
    let dispatcher = Arc::new(CommandDispatcher::new(sim.clone()));
    let controller = FlightController::new(sim.clone(), dispatcher, &cfg);

    controller.start();
    for _ in 0..100 {
        tokio::time::sleep(TICK_PERIOD).await;
        sim.step(TICK_PERIOD.as_secs_f64());
    }

    let snap = sim.latest_snapshot().unwrap();
    assert_eq!(controller.current_phase(), FlightPhase::Taxi);
    assert!(snap.on_ground);
    assert_eq!(snap.ground_speed_kts, 0.0);
    assert!(snap.parking_brake_on);

    // Released at runtime, the aircraft starts to roll.
    controller.set_hold_short(false);
    for _ in 0..150 {
        tokio::time::sleep(TICK_PERIOD).await;
        sim.step(TICK_PERIOD.as_secs_f64());
    }
    let snap = sim.latest_snapshot().unwrap();
    assert!(!snap.parking_brake_on);
    assert!(snap.ground_speed_kts > 0.5);

    controller.stop();
}
