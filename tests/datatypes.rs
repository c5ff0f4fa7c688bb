//! Datatype handles as MPI sees them. Owns MPI for the whole binary, so everything lives in a
//! single test that finalizes at the end.

use std::num::Wrapping;

use kamping::datatype::Combiner;
use kamping::environment::registered_type_count;
use kamping::ffi;
use kamping::prelude::*;

#[test]
fn datatypes_through_the_library() {
    let env = Environment::new(InitMode::InitFinalizeIfNecessary).unwrap();
    {
        let world = env.world().unwrap();
        builtin_handles();
        composite_handles();
        explicit_datatypes(&world);
    }

    assert!(registered_type_count() > 0);
    drop(env);
    assert_eq!(registered_type_count(), 0);
    assert!(Environment::finalized().unwrap());
}

fn builtin_handles() {
    assert_eq!(datatype_of::<i32>().as_raw(), unsafe { ffi::KAMPING_INT32_T });
    assert_eq!(datatype_of::<i64>().as_raw(), unsafe { ffi::KAMPING_INT64_T });
    assert_eq!(datatype_of::<u16>().as_raw(), unsafe { ffi::KAMPING_UINT16_T });
    assert_eq!(datatype_of::<f64>().as_raw(), unsafe { ffi::KAMPING_DOUBLE });
    assert!(datatype_of::<i32>().is_builtin());

    assert_eq!(datatype_of::<Wrapping<u16>>(), datatype_of::<u16>());
    assert_eq!(datatype_of::<Wrapping<i64>>(), datatype_of::<i64>());
}

fn composite_handles() {
    let array = datatype_of::<[i32; 4]>();
    assert!(!array.is_builtin());
    assert_eq!(array.envelope().unwrap().combiner, Combiner::Contiguous);
    let (count, element) = array.contiguous_parts().unwrap().unwrap();
    assert_eq!(count, 4);
    assert_eq!(element.map(|element| element.as_raw()), Some(datatype_of::<i32>().as_raw()));
    assert_eq!(array.size().unwrap(), 16);

    let pair = datatype_of::<(u8, f64)>();
    assert_eq!(pair.envelope().unwrap().combiner, Combiner::Resized);
    assert_eq!(pair.size().unwrap(), 9);
    assert_eq!(pair.extent().unwrap().extent, 16);
}

fn explicit_datatypes(world: &Communicator) {
    let rank = world.rank();

    let rows: Vec<[i32; 4]> = (0..3).map(|row| [rank, row, row * 2, -row]).collect();
    world
        .send((send_buf(&rows), destination(rank), tag(1)))
        .unwrap();
    let echoed: Vec<[i32; 4]> = world
        .recv((source(rank), tag(1)))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(echoed, rows);

    // pairs of i32 counted as one element each
    let pair = Datatype::contiguous(2, &datatype_of::<i32>()).unwrap();
    Environment::register_mpi_type(pair);
    let values: Vec<i32> = (0..6).map(|i| rank * 100 + i).collect();
    let mut request = world
        .irecv((recv_count(3), recv_type(pair), source(rank), tag(2)))
        .unwrap();
    world
        .send((
            send_buf(&values),
            send_count(3),
            send_type(pair),
            destination(rank),
            tag(2),
        ))
        .unwrap();
    let received: Vec<i32> = request.wait().unwrap().extract_recv_buffer();
    assert_eq!(received, values);

    let mut gathered = Vec::new();
    world
        .allgather((
            send_buf(&values[..2]),
            send_count(1),
            send_type(pair),
            recv_buf(&mut gathered).resize_to_fit(),
            recv_count(1),
            recv_type(pair),
        ))
        .unwrap();
    assert_eq!(gathered.len(), 2 * world.size() as usize);
    assert_eq!(&gathered[2 * rank as usize..2 * rank as usize + 2], &values[..2]);
}
