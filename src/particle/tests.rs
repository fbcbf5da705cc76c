// particle/tests.rs
// Particle state transitions, Rydberg limits and ensemble generation

use super::*;
use crate::config::{AcceleratorConfig, ParticlesConfig};
use approx::assert_relative_eq;
use ultraviolet::Vec3;

mod state {
    use super::*;

    #[test]
    fn new_particle_remembers_its_start() {
        let p = Particle::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 5.0), 25, 20);
        assert!(p.is_alive());
        assert_eq!(p.trajectory().len(), 1);
        assert_eq!(p.recall_position(0), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(p.recall_velocity(0), Some(Vec3::new(0.0, 0.0, 5.0)));
        assert_eq!(p.recall_position(1), None);
    }

    #[test]
    fn limits_follow_closed_forms() {
        let p = Particle::new(Vec3::zero(), Vec3::zero(), 25, 20);
        assert_relative_eq!(p.ionisation_limit(), 1.14222e11 / 390_625.0, max_relative = 1e-6);
        let it = 1.71407e11 * 51.0 / (15_625.0 * 676.0 * 46.0);
        assert_relative_eq!(p.inglis_teller_limit(), it, max_relative = 1e-5);
        assert!(p.inglis_teller_limit() < p.ionisation_limit());
        assert_relative_eq!(
            p.dipole_moment(),
            1.5 * 25.0 * 20.0 * -1.602_176_57e-19 * 5.291_772_1e-11,
            max_relative = 1e-5
        );
    }

    #[test]
    fn neutralisation_zeroes_force_and_keeps_first_step() {
        let mut p = Particle::new(Vec3::zero(), Vec3::zero(), 25, 20);
        let intrinsic = p.dipole_moment();
        p.neutralise(7);
        p.neutralise(9);
        assert_eq!(p.neutralised_at(), Some(7));
        assert_eq!(p.dipole_moment(), 0.0);
        assert_eq!(p.intrinsic_dipole_moment(), intrinsic);
        assert!(p.is_alive());
        assert_eq!(p.trajectory().len(), 1);
    }

    #[test]
    fn terminal_transitions() {
        let mut kept = Particle::new(Vec3::zero(), Vec3::zero(), 25, 20);
        kept.pos = Vec3::new(0.0, 0.0, 4.0);
        kept.collide(true);
        assert_eq!(kept.status(), Status::Collided);
        assert_eq!(kept.trajectory().len(), 2);

        let mut dropped = Particle::new(Vec3::zero(), Vec3::zero(), 25, 20);
        dropped.collide(false);
        assert!(dropped.trajectory().is_empty());

        let mut ionised = Particle::new(Vec3::zero(), Vec3::zero(), 25, 20);
        ionised.ionise();
        assert!(ionised.status().is_terminal());

        let mut done = Particle::new(Vec3::zero(), Vec3::zero(), 25, 20);
        done.succeed();
        assert_eq!(done.status(), Status::Succeeded);
        assert!(!Status::Alive.is_terminal());
    }

    #[test]
    fn advance_uses_updated_velocity() {
        let mut p = Particle::new(Vec3::zero(), Vec3::new(0.0, 0.0, 100.0), 25, 20);
        p.advance(Vec3::new(0.0, 0.0, 1e6), 1e-6);
        assert_relative_eq!(p.vel.z, 101.0, max_relative = 1e-6);
        // (101 * 1e-6 + 0.5 * 1e6 * 1e-12) m = 0.1015 mm
        assert_relative_eq!(p.pos.z, 0.1015, max_relative = 1e-5);
    }

    #[test]
    fn grid_coordinate_rounds_to_nearest() {
        let mut p = Particle::new(Vec3::new(1.4, 1.6, -0.6), Vec3::zero(), 25, 20);
        assert_eq!(p.grid_coord(), [1, 2, -1]);
        p.pos = Vec3::new(2.5, 0.49, 9.51);
        assert_eq!(p.grid_coord(), [3, 0, 10]);
    }

    #[test]
    fn cut_down_keeps_endpoints() {
        let mut p = Particle::new(Vec3::zero(), Vec3::zero(), 25, 20);
        for i in 1..=5 {
            p.pos = Vec3::new(0.0, 0.0, i as f32);
            p.memorise();
        }
        p.cut_down_memory();
        assert_eq!(p.trajectory().len(), 2);
        assert_eq!(p.recall_position(1), Some(Vec3::new(0.0, 0.0, 5.0)));
        p.forget();
        assert!(p.trajectory().is_empty());
    }
}

mod ensemble {
    use super::*;
    use crate::particle::generator::thermal_velocity_spread;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_accelerator() -> AcceleratorConfig {
        AcceleratorConfig {
            n_electrodes: 12,
            dimensions: [32, 32, 62],
            ..Default::default()
        }
    }

    #[test]
    fn first_particle_is_synchronous() {
        let particles_cfg = ParticlesConfig {
            n_particles: 50,
            sync_start: 12.0,
            ..Default::default()
        };
        let mut generator = EnsembleGenerator::new(&particles_cfg, &small_accelerator(), Some(1)).unwrap();
        let particles = generator.generate().unwrap();
        assert_eq!(particles.len(), 50);
        assert_eq!(particles[0].pos, Vec3::new(15.0, 15.0, 12.0));
        assert_eq!(particles[0].vel, Vec3::zero());
        assert_eq!(particles[0].k(), 20);
    }

    #[test]
    fn uniform_cylinder_stays_inside_bounds() {
        let particles_cfg = ParticlesConfig {
            n_particles: 500,
            ..Default::default()
        };
        let acc = small_accelerator();
        let width = acc.section_width();
        let mut generator = EnsembleGenerator::new(&particles_cfg, &acc, Some(42)).unwrap();
        let max_speed = 2.0 * generator.sigma_v() * 1.0001;
        for p in generator.generate().unwrap().iter().skip(1) {
            let r = ((p.pos.x - 15.0).powi(2) + (p.pos.y - 15.0).powi(2)).sqrt();
            assert!(r <= 10.0 + 1e-3, "radius {r}");
            assert!(p.pos.z >= width && p.pos.z <= 4.0 * width + 1e-3);
            assert!(p.vel.mag() <= max_speed);
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let cfg = ParticlesConfig {
            n_particles: 20,
            norm_dist: true,
            k_dist: "uniform".into(),
            ..Default::default()
        };
        let a = EnsembleGenerator::new(&cfg, &small_accelerator(), Some(7)).unwrap().generate().unwrap();
        let b = EnsembleGenerator::new(&cfg, &small_accelerator(), Some(7)).unwrap().generate().unwrap();
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.pos, pb.pos);
            assert_eq!(pa.vel, pb.vel);
            assert_eq!(pa.k(), pb.k());
        }
    }

    #[test]
    fn k_distributions_respect_their_support() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let u = KDistribution::Uniform.sample(25, &mut rng);
            assert!((1..=24).contains(&u));
            let t = KDistribution::Triangle.sample(25, &mut rng);
            assert!((0..=24).contains(&t));
        }
        assert_eq!(KDistribution::Single(-3).sample(25, &mut rng), -3);
    }

    #[test]
    fn triangle_favours_low_k() {
        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<i32> = (0..4000).map(|_| KDistribution::Triangle.sample(30, &mut rng)).collect();
        let mean = samples.iter().sum::<i32>() as f32 / samples.len() as f32;
        // Expected n/3 - 1/2 for the floored variate.
        assert!((mean - 9.5).abs() < 1.0, "mean {mean}");
    }

    #[test]
    fn thermal_spread_at_one_kelvin() {
        assert_relative_eq!(thermal_velocity_spread(1.0), 83.7, max_relative = 1e-2);
        assert_eq!(thermal_velocity_spread(0.0), 0.0);
    }
}
