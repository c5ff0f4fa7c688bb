#![deny(warnings)]

use kamping::prelude::*;
use num_complex::Complex64;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank() as f64;

    let sum = world
        .allreduce_single((send_buf(&Complex64::new(rank, 1.0)), op(BuiltinOp::Sum)))
        .unwrap();
    let size = world.size() as f64;
    assert_eq!(sum, Complex64::new(size * (size - 1.0) / 2.0, size));

    let mut roots = if world.is_root() {
        vec![Complex64::new(0.0, 1.0), Complex64::new(-1.0, 0.0)]
    } else {
        Vec::new()
    };
    world
        .bcast(send_recv_buf(&mut roots).resize_to_fit())
        .unwrap();
    assert_eq!(roots[0] * roots[0], roots[1]);
}
