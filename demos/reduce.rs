#![deny(warnings)]

use kamping::prelude::*;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank();
    let size = world.size();

    let sum = world
        .reduce_single((send_buf(&rank), op(BuiltinOp::Sum)))
        .unwrap();
    if world.is_root() {
        assert_eq!(sum, Some(size * (size - 1) / 2));
    } else {
        assert_eq!(sum, None);
    }

    let max = world
        .allreduce_single((send_buf(&rank), op(BuiltinOp::Max)))
        .unwrap();
    assert_eq!(max, size - 1);

    // element-wise, with storage provided by the caller
    let mut products = Vec::new();
    world
        .allreduce((
            send_buf(&[rank + 1, 2][..]),
            recv_buf(&mut products).resize_to_fit(),
            op(BuiltinOp::Product),
        ))
        .unwrap();
    assert_eq!(products[0], (1..=size).product::<i32>());
    assert_eq!(products[1], 2_i32.pow(size as u32));

    // a reduction MPI has no predefined operation for
    let longest = world
        .allreduce_single((
            send_buf(&(rank as u64)),
            op(commutative(|a: &u64, b: &u64| (*a).max(*b))),
        ))
        .unwrap();
    assert_eq!(longest, size as u64 - 1);

    let prefix = world
        .scan_single((send_buf(&1), op(BuiltinOp::Sum)))
        .unwrap();
    assert_eq!(prefix, rank + 1);

    // the combination order must follow the ranks
    let digits = world
        .scan_single((
            send_buf(&(rank as u64 % 10)),
            op(non_commutative(|lhs: &u64, rhs: &u64| lhs * 10 + rhs)),
        ))
        .unwrap();
    let expected = (0..=rank as u64).fold(0, |acc, r| acc * 10 + r % 10);
    assert_eq!(digits, expected);

    let before = world
        .exscan_single((send_buf(&(rank + 1)), op(BuiltinOp::Sum)))
        .unwrap();
    assert_eq!(before, rank * (rank + 1) / 2);

    let offsets = world
        .exscan((
            send_buf(&[1, 2][..]),
            op(BuiltinOp::Sum),
            values_on_rank_0(&[100][..]),
        ))
        .unwrap()
        .extract_recv_buffer();
    if rank == 0 {
        assert_eq!(offsets, vec![100, 100]);
    } else {
        assert_eq!(offsets, vec![rank, 2 * rank]);
    }
}
