#![deny(warnings)]

use kamping::prelude::*;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank();
    let size = world.size();

    let table: Vec<i32> = (0..2 * size).collect();
    let mine = if world.is_root() {
        world.scatter(send_buf(&table)).unwrap()
    } else {
        world.scatter(()).unwrap()
    }
    .extract_recv_buffer();
    assert_eq!(mine, vec![2 * rank, 2 * rank + 1]);

    // rank i gets i + 1 elements
    let counts: Vec<i32> = (1..=size).collect();
    let values: Vec<i32> = counts
        .iter()
        .enumerate()
        .flat_map(|(r, &count)| std::iter::repeat(r as i32).take(count as usize))
        .collect();
    let mine = if world.is_root() {
        world
            .scatterv((send_buf(&values), send_counts(&counts)))
            .unwrap()
    } else {
        world.scatterv(()).unwrap()
    }
    .extract_recv_buffer();
    assert_eq!(mine, vec![rank; rank as usize + 1]);
}
