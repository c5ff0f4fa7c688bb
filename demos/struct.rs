#![deny(warnings)]

use kamping::prelude::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Equivalence)]
struct Particle {
    position: [f64; 3],
    charge: i8,
    id: u32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct Opaque([u16; 3]);
kamping::impl_equivalence_as_bytes!(Opaque);

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank();
    let size = world.size();

    let mine = Particle {
        position: [rank as f64, 0.5, -1.0],
        charge: -(rank as i8 % 2),
        id: rank as u32 * 3,
    };
    let all = world
        .allgather(send_buf(&mine))
        .unwrap()
        .extract_recv_buffer();
    for (r, particle) in all.iter().enumerate() {
        assert_eq!(particle.position[0], r as f64);
        assert_eq!(particle.charge, -(r as i8 % 2));
        assert_eq!(particle.id, r as u32 * 3);
    }

    let pairs = world
        .allgather(send_buf(&(rank, rank as f32 / 2.0)))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(pairs[size as usize - 1], (size - 1, (size - 1) as f32 / 2.0));

    let rows = world
        .allgather(send_buf(&[rank; 4]))
        .unwrap()
        .extract_recv_buffer();
    assert!(rows.iter().enumerate().all(|(r, row)| row == &[r as i32; 4]));

    let opaque = Opaque([rank as u16, 7, 9]);
    let received = world
        .bcast_single((send_recv_buf(&mut opaque.clone()), root(size - 1)))
        .unwrap();
    assert_eq!(received, Opaque([size as u16 - 1, 7, 9]));

    // the registry keeps every committed type until it is freed
    assert!(kamping::environment::registered_type_count() >= 3);
}
