#![deny(warnings)]

use kamping::prelude::*;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    println!(
        "Hello parallel world from process {} of {} on {}!",
        world.rank(),
        world.size(),
        Environment::processor_name().unwrap().unwrap()
    );

    world.barrier().unwrap();

    let greeting = if world.is_root() { 42_u64 } else { 0 };
    let received = world.bcast_single(send_recv_buf(&mut greeting.clone())).unwrap();
    assert_eq!(received, 42);

    // the size of the broadcast vector is only known on the root
    let mut values = if world.is_root() {
        (0..10).collect::<Vec<i32>>()
    } else {
        Vec::new()
    };
    world
        .bcast(send_recv_buf(&mut values).resize_to_fit())
        .unwrap();
    assert_eq!(values, (0..10).collect::<Vec<i32>>());
}
