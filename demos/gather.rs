#![deny(warnings)]

use kamping::prelude::*;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank();
    let size = world.size();

    let i = 2_u64.pow(rank as u32 + 1);
    let gathered = world.gather(send_buf(&i)).unwrap().extract_recv_buffer();
    if world.is_root() {
        println!("Root gathered sequence: {:?}.", gathered);
        assert!(gathered
            .iter()
            .enumerate()
            .all(|(r, &value)| value == 2_u64.pow(r as u32 + 1)));
    } else {
        assert!(gathered.is_empty());
    }

    let last = size - 1;
    let mine = vec![rank; rank as usize];
    let mut result = world
        .gatherv((send_buf(&mine), root(last), recv_counts_out()))
        .unwrap();
    let counts = result.extract_recv_counts();
    let values = result.extract_recv_buffer();
    if rank == last {
        assert_eq!(counts, (0..size).collect::<Vec<_>>());
        let expected: Vec<i32> = (0..size)
            .flat_map(|r| std::iter::repeat(r).take(r as usize))
            .collect();
        assert_eq!(values, expected);
    }
}
