#![deny(warnings)]

use kamping::prelude::*;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank();
    let size = world.size();

    let outgoing: Vec<i32> = (0..size).map(|r| rank * size + r).collect();
    let incoming = world
        .alltoall(send_buf(&outgoing))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(incoming, (0..size).map(|r| r * size + rank).collect::<Vec<_>>());

    // rank i sends j copies of i to rank j
    let per_destination: Vec<i32> = (0..size).collect();
    let outgoing: Vec<i32> = per_destination
        .iter()
        .flat_map(|&count| std::iter::repeat(rank).take(count as usize))
        .collect();
    let mut result = world
        .alltoallv((
            send_buf(&outgoing),
            send_counts(&per_destination),
            recv_counts_out(),
        ))
        .unwrap();
    let counts = result.extract_recv_counts();
    let incoming = result.extract_recv_buffer();
    assert_eq!(counts, vec![rank; size as usize]);
    let expected: Vec<i32> = (0..size)
        .flat_map(|r| std::iter::repeat(r).take(rank as usize))
        .collect();
    assert_eq!(incoming, expected);
}
