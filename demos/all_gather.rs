#![deny(warnings)]

use kamping::prelude::*;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank();
    let size = world.size();

    let gathered = world
        .allgather(send_buf(&rank))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(gathered, (0..size).collect::<Vec<_>>());

    // rank i contributes i + 1 copies of i
    let mine = vec![rank; rank as usize + 1];
    let mut result = world
        .allgatherv((send_buf(&mine), recv_counts_out(), recv_displs_out()))
        .unwrap();
    let counts = result.extract_recv_counts();
    let displs = result.extract_recv_displs();
    let values = result.extract_recv_buffer();
    assert_eq!(counts, (1..=size).collect::<Vec<_>>());
    for (r, (&count, &displ)) in counts.iter().zip(&displs).enumerate() {
        let block = &values[displ as usize..(displ + count) as usize];
        assert!(block.iter().all(|&v| v == r as i32));
    }

    // caller provided displacements leave gaps in the receive buffer
    let strided: Vec<i32> = (0..size).map(|r| 2 * r).collect();
    let ones: Vec<i32> = vec![1; size as usize];
    let values = world
        .allgatherv((
            send_buf(&[rank][..]),
            recv_counts(&ones),
            recv_displs(&strided),
        ))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(values.len(), 2 * size as usize - 1);
    for r in 0..size as usize {
        assert_eq!(values[2 * r], r as i32);
    }

    let mut in_place = vec![-1; size as usize];
    in_place[rank as usize] = rank * 10;
    world
        .allgather_inplace(send_recv_buf(&mut in_place))
        .unwrap();
    assert_eq!(in_place, (0..size).map(|r| r * 10).collect::<Vec<_>>());
}
