// voltage/tests.rs
// Behaviour of the three voltage schedules

use super::*;
use approx::assert_relative_eq;

fn params(n_electrodes: usize, section_width: f32) -> SchemeParams {
    SchemeParams {
        max_voltage: 100.0,
        n_electrodes,
        section_width,
        time_step: 1e-6,
        target_vel: 500.0,
        duration: 6e-4,
        grid_length: 198.0,
    }
}

mod construction {
    use super::*;

    #[test]
    fn kind_names_parse() {
        assert_eq!("trap".parse::<SchemeKind>().unwrap(), SchemeKind::MovingTrap);
        assert_eq!("Exponential".parse::<SchemeKind>().unwrap(), SchemeKind::Exponential);
        assert_eq!("instantaneous".parse::<SchemeKind>().unwrap(), SchemeKind::Instantaneous);
        assert!(matches!("linear".parse::<SchemeKind>(), Err(SimError::UnknownScheme(_))));
    }

    #[test]
    fn synchronous_schemes_need_a_particle() {
        let err = VoltageScheme::new(SchemeKind::Instantaneous, params(12, 10.0), None, 20.0).unwrap_err();
        assert!(matches!(err, SimError::MissingSynchronousParticle));
        let trap = VoltageScheme::new(SchemeKind::MovingTrap, params(12, 10.0), None, 20.0).unwrap();
        assert_eq!(trap.kind(), SchemeKind::MovingTrap);
    }

    #[test]
    fn section_ranges_are_clipped() {
        let p = params(10, 10.0);
        assert_eq!(p.n_sections(), 2);
        assert_eq!(p.section_electrodes(1), 0..4);
        assert_eq!(p.section_electrodes(3), 8..10);
        assert_eq!(p.section_electrodes(4), 10..10);
    }
}

mod instantaneous {
    use super::*;

    #[test]
    fn first_section_starts_on() {
        let mut scheme = InstantaneousScheme::new(params(12, 10.0));
        let v = scheme.initial_voltages();
        assert_eq!(&v[0..4], &[100.0; 4]);
        assert!(v[4..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn section_switches_when_sync_crosses() {
        let mut scheme = VoltageScheme::new(
            SchemeKind::Instantaneous,
            params(12, 10.0),
            Some(SyncState { z: 15.0, vz: 1000.0 }),
            20.0,
        )
        .unwrap();
        scheme.initial_voltages();

        let mut triggered_at = None;
        for step in 0..10 {
            let sync = SyncState { z: 15.0 + step as f32, vz: 1000.0 };
            if scheme.is_active(step, Some(sync)) {
                triggered_at = Some(step);
                break;
            }
        }
        assert_eq!(triggered_at, Some(5));

        let VoltageScheme::Instantaneous(inner) = &scheme else { unreachable!() };
        assert_eq!(inner.section(), 2);
        let v = scheme.voltages(5).to_vec();
        assert_eq!(&v[4..8], &[100.0; 4]);
        assert!(v[8..].iter().all(|&x| x == 0.0));
        let VoltageScheme::Instantaneous(inner) = &scheme else { unreachable!() };
        assert_eq!(inner.section(), 3);
    }

    #[test]
    fn no_sections_left_means_inactive() {
        let mut scheme = InstantaneousScheme::new(params(12, 10.0));
        scheme.initial_voltages();
        scheme.voltages();
        assert_eq!(scheme.section(), 3);
        assert!(!scheme.is_active(Some(SyncState { z: 1000.0, vz: 0.0 })));
        assert!(!scheme.is_active(None));
    }
}

mod exponential {
    use super::*;

    #[test]
    fn ramp_spans_one_section_transit() {
        let mut scheme = ExponentialScheme::new(params(12, 10.0), SyncState { z: 0.0, vz: 1000.0 });
        scheme.initial_voltages();

        // 1 mm per 1 us step.
        let sync_at = |step: usize| SyncState { z: step as f32, vz: 1000.0 };
        for step in 0..20 {
            assert!(!scheme.is_active(step, Some(sync_at(step))));
        }
        assert!(scheme.is_active(20, Some(sync_at(20))));

        let (start, duration) = scheme.ramp_window().unwrap();
        assert_relative_eq!(start, 20e-6, max_relative = 1e-6);
        assert!(duration.is_finite() && duration > 0.0);
        assert_relative_eq!(duration, 1e-5, max_relative = 1e-4);
        assert_eq!(scheme.section(), 3);

        let at_start = scheme.voltages(20).to_vec();
        assert_relative_eq!(at_start[4], 0.0);
        assert_eq!(&at_start[0..4], &[100.0; 4]);

        for step in 21..=30 {
            assert!(scheme.is_active(step, Some(sync_at(step))));
        }
        let at_end = scheme.voltages(30).to_vec();
        assert_relative_eq!(at_end[4], 100.0, max_relative = 1e-3);
        assert_relative_eq!(at_end[7], 100.0, max_relative = 1e-3);
        assert!(at_end[8..].iter().all(|&x| x == 0.0));

        assert!(!scheme.is_active(32, Some(sync_at(32))));
    }

    #[test]
    fn ramp_rises_monotonically() {
        let scheme = ExponentialScheme::new(params(12, 10.0), SyncState { z: 0.0, vz: 1000.0 });
        let mut last = -1.0;
        for i in 0..=10 {
            let v = scheme.ramp_voltage(i as f32 * 1e-6, 1e-5);
            assert!(v > last);
            last = v;
        }
        assert!(scheme.ramp_voltage(5e-5, 1e-5) <= 100.0);
    }

    #[test]
    fn stalled_particle_never_triggers() {
        let mut scheme = ExponentialScheme::new(params(12, 10.0), SyncState { z: 25.0, vz: 0.0 });
        scheme.initial_voltages();
        for step in 0..50 {
            assert!(!scheme.is_active(step, Some(SyncState { z: 25.0, vz: 0.0 })));
        }
        assert_eq!(scheme.section(), 2);
        assert!(scheme.ramp_window().is_none());
    }

    #[test]
    fn acceleration_shortens_the_ramp() {
        let scheme = ExponentialScheme::new(params(12, 10.0), SyncState { z: 0.0, vz: 0.0 });
        // From rest to 1000 m/s in 20 us: a = 5e7 m/s^2.
        let accelerating = scheme.traverse_time(1000.0, 20e-6).unwrap();
        assert!(accelerating < 1e-5);
        let w = 0.01f32;
        let a = 5e7f32;
        assert_relative_eq!(1000.0 * accelerating + 0.5 * a * accelerating * accelerating, w, max_relative = 1e-3);
    }

    #[test]
    fn slow_particle_ramp_stays_finite() {
        let p = SchemeParams {
            time_step: 1e-4,
            duration: 1.0,
            ..params(12, 10.0)
        };
        let sync = SyncState { z: 20.0, vz: 0.05 };
        let mut scheme = ExponentialScheme::new(p, sync);
        scheme.initial_voltages();
        assert!(scheme.is_active(0, Some(sync)));
        let (_, duration) = scheme.ramp_window().unwrap();
        assert_relative_eq!(duration, 0.2, max_relative = 1e-4);

        assert_eq!(scheme.ramp_voltage(0.0, duration), 0.0);
        let mid = scheme.ramp_voltage(0.1, duration);
        assert!(mid.is_finite() && (0.0..=100.0).contains(&mid));
        assert_eq!(scheme.ramp_voltage(duration, duration), 100.0);

        for step in 0..=2100 {
            let v = scheme.voltages(step);
            assert!(v.iter().all(|x| x.is_finite() && (0.0..=100.0).contains(x)), "step {step}");
        }
        assert_eq!(scheme.voltages(2100)[4], 100.0);
    }
}

mod moving_trap {
    use super::*;
    use crate::voltage::moving_trap::{off_time, trap_frequency, FALLBACK_FREQUENCY};

    #[test]
    fn frequency_fit_and_fallback() {
        assert_relative_eq!(trap_frequency(20.0, 100.0), (4.1e5f32 * 2000.0 - 2.2e6).sqrt(), max_relative = 1e-5);
        assert_eq!(trap_frequency(0.0, 100.0), FALLBACK_FREQUENCY);
        assert_eq!(trap_frequency(-5.0, 100.0), FALLBACK_FREQUENCY);
    }

    #[test]
    fn off_time_is_nearest_half_period() {
        assert_relative_eq!(off_time(1000.0, 0.0102, 1.0), 10.5e-3, max_relative = 1e-5);
        assert_relative_eq!(off_time(1000.0, 0.0001, 1.0), 0.5e-3, max_relative = 1e-5);
        assert_eq!(off_time(1000.0, 0.0102, 0.005), 0.005);
    }

    #[test]
    fn initial_pattern_follows_section_angles() {
        let mut scheme = MovingTrapScheme::new(params(24, 10.0), 20.0);
        let v = scheme.initial_voltages().to_vec();
        assert_relative_eq!(v[0], 50.0, max_relative = 1e-5);
        assert_relative_eq!(v[4], -50.0, max_relative = 1e-5);
        assert_relative_eq!(v[8], -100.0, max_relative = 1e-5);
        assert_relative_eq!(v[20], 100.0, max_relative = 1e-5);
    }

    #[test]
    fn zero_and_inactive_after_off_time() {
        let p = params(12, 10.0);
        let mut scheme = VoltageScheme::new(SchemeKind::MovingTrap, p, None, 20.0).unwrap();
        let VoltageScheme::MovingTrap(inner) = &scheme else { unreachable!() };
        let t_off = inner.off_time();
        assert!(t_off > 0.0 && t_off <= p.duration);
        scheme.initial_voltages();

        let mut first_off = None;
        for step in 0..700 {
            let was_active = scheme.is_active(step, None);
            let v = scheme.voltages(step).to_vec();
            if step as f32 * p.time_step >= t_off {
                first_off.get_or_insert(step);
                assert!(v.iter().all(|&x| x == 0.0), "step {step} not zero");
                assert!(!scheme.is_active(step, None));
            } else {
                assert!(was_active);
                assert!(v.iter().any(|&x| x != 0.0));
            }
        }
        assert!(first_off.is_some());
        // Once off, always off, even for earlier times.
        assert!(scheme.voltages(0).iter().all(|&x| x == 0.0));
        assert!(!scheme.is_active(0, None));
    }
}
