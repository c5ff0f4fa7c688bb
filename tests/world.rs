//! Runs against whatever world the test binary is started in, a singleton under `cargo test`.
//!
//! MPI can be initialized once per process, so everything lives in a single test.

use kamping::nonblocking::State;
use kamping::prelude::*;
use kamping::Error;

#[test]
fn operations_on_the_world() {
    let mut env = Environment::new(InitMode::InitFinalizeIfNecessary).unwrap();
    let world = env.world().unwrap();

    allgather_variants(&world);
    rooted_collectives(&world);
    all_to_all(&world);
    reductions(&world);
    point_to_point(&world);
    completion_contracts(&world);
    parameter_errors(&world);
    buffered_sends(&mut env, &world);
}

fn allgather_variants(world: &Communicator) {
    let rank = world.rank();
    let size = world.size();

    let mut result = world
        .allgather((send_buf(&[rank, -rank][..]), recv_count_out()))
        .unwrap();
    assert_eq!(result.extract_recv_count(), 2);
    let values = result.extract_recv_buffer();
    assert_eq!(values.len(), 2 * size as usize);
    assert_eq!(values[2 * rank as usize + 1], -rank);

    let mine = vec![rank; rank as usize + 1];
    let (values, counts, displs): (Vec<i32>, Vec<i32>, Vec<i32>) = world
        .allgatherv((send_buf(&mine), recv_counts_out(), recv_displs_out()))
        .unwrap()
        .destructure();
    assert_eq!(counts, (1..=size).collect::<Vec<_>>());
    assert_eq!(displs, (0..size).map(|r| r * (r + 1) / 2).collect::<Vec<_>>());
    assert_eq!(values.len() as i32, size * (size + 1) / 2);
    for r in 0..size {
        let start = displs[r as usize] as usize;
        let block = &values[start..start + r as usize + 1];
        assert!(block.iter().all(|&value| value == r));
    }

    let mut in_place = vec![-1; size as usize];
    in_place[rank as usize] = rank;
    world.allgather_inplace(send_recv_buf(&mut in_place)).unwrap();
    assert_eq!(in_place, (0..size).collect::<Vec<_>>());

    // a larger caller provided buffer keeps its size
    let mut storage = vec![-1; 3 * size as usize];
    world
        .allgather((send_buf(&rank), recv_buf(&mut storage).grow_only()))
        .unwrap();
    assert_eq!(storage.len(), 3 * size as usize);
    assert_eq!(storage[rank as usize], rank);
}

fn rooted_collectives(world: &Communicator) {
    let rank = world.rank();
    let size = world.size();

    let table: Vec<u16> = (0..size as u16 * 3).collect();
    let mine = world
        .scatter((send_buf(&table), recv_count_out()))
        .unwrap()
        .destructure::<(Vec<u16>, i32)>();
    assert_eq!(mine.1, 3);
    assert_eq!(mine.0[0], rank as u16 * 3);

    let gathered = world.gather(send_buf(&mine.0)).unwrap().extract_recv_buffer();
    if world.is_root() {
        assert_eq!(gathered, table);
    }

    let mut announcement = if world.is_root() {
        String::from("ready").into_bytes()
    } else {
        Vec::new()
    };
    let count = world
        .bcast((
            send_recv_buf(&mut announcement).resize_to_fit(),
            send_recv_count_out(),
        ))
        .unwrap()
        .extract_send_recv_count();
    assert_eq!(count, 5);
    assert_eq!(announcement, b"ready");
}

fn all_to_all(world: &Communicator) {
    let rank = world.rank();
    let size = world.size();

    let blocks: Vec<i32> = (0..size).map(|r| rank * size + r).collect();
    let exchanged = world.alltoall(send_buf(&blocks)).unwrap().extract_recv_buffer();
    assert_eq!(exchanged, (0..size).map(|r| r * size + rank).collect::<Vec<_>>());

    // rank `i` sends `j` copies of `i` to rank `j`
    let counts: Vec<i32> = (0..size).collect();
    let data: Vec<i32> = counts
        .iter()
        .flat_map(|&count| std::iter::repeat(rank).take(count as usize))
        .collect();
    let mut result = world
        .alltoallv((
            send_buf(&data),
            send_counts(&counts),
            recv_counts_out(),
            recv_displs_out(),
        ))
        .unwrap();
    assert_eq!(result.extract_recv_counts(), vec![rank; size as usize]);
    assert_eq!(
        result.extract_recv_displs(),
        (0..size).map(|r| r * rank).collect::<Vec<_>>()
    );
    let expected: Vec<i32> = (0..size)
        .flat_map(|r| std::iter::repeat(r).take(rank as usize))
        .collect();
    assert_eq!(result.extract_recv_buffer(), expected);
}

fn reductions(world: &Communicator) {
    let rank = world.rank();
    let size = world.size();

    let sums = world
        .allreduce((send_buf(&[1.5_f64, rank as f64][..]), op(BuiltinOp::Sum)))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(sums[0], 1.5 * size as f64);

    let any = world
        .allreduce_single((send_buf(&(rank == 0)), op(BuiltinOp::LogicalOr)))
        .unwrap();
    assert!(any);

    let concatenated = world
        .scan_single((
            send_buf(&(rank as u64 + 1)),
            op(non_commutative(|lhs: &u64, rhs: &u64| lhs * 10 + rhs)),
        ))
        .unwrap();
    assert_eq!(concatenated % 10, rank as u64 + 1);

    let minimum = world
        .reduce_single((send_buf(&(size - rank)), op(BuiltinOp::Min)))
        .unwrap();
    assert_eq!(minimum.is_some(), world.is_root());

    let offsets = world
        .exscan_single((
            send_buf(&2_i64),
            op(BuiltinOp::Sum),
            values_on_rank_0(&-1_i64),
        ))
        .unwrap();
    assert_eq!(offsets, if rank == 0 { -1 } else { 2 * rank as i64 });

    // the recorded commutativity agrees with what MPI reports for the handle
    let sum: ReduceOperation<'_, i32> = ReduceOperation::builtin(BuiltinOp::Sum);
    assert!(sum.transport_commutative().unwrap());
    let add = commutative(|lhs: &i32, rhs: &i32| lhs + rhs);
    assert!(add.transport_commutative().unwrap());
    let concat = non_commutative(|lhs: &i32, rhs: &i32| lhs * 10 + rhs);
    assert!(!concat.transport_commutative().unwrap());
}

fn point_to_point(world: &Communicator) {
    let rank = world.rank();
    let payload: Vec<i64> = (0..16).map(|i| i * 1000 + rank as i64).collect();

    let mut send = world
        .isend((send_buf(&payload), destination(rank), tag(3)))
        .unwrap();
    let (received, received_status): (Vec<i64>, Status) = world
        .recv((source::<i64>(rank), tag(3), status_out()))
        .unwrap()
        .destructure();
    send.wait().unwrap();
    assert_eq!(received, payload);
    assert_eq!(received_status.tag(), 3);
    assert_eq!(received_status.count::<i64>().unwrap(), 16);

    // a completed result hands out nothing more
    assert_eq!(send.state(), State::Consumed);
    assert!(matches!(send.wait(), Err(Error::NotPending)));
    assert!(matches!(send.test(), Err(Error::NotPending)));
    assert!(matches!(unsafe { send.extract() }, Err(Error::NotPending)));

    // a moved send buffer comes back on completion
    let mut moved = world
        .isend((send_buf_out(vec![1_u32, 3, 5]), destination(rank), tag(5)))
        .unwrap();
    let echoed: Vec<u32> = world
        .recv((source(rank), tag(5), recv_count(3)))
        .unwrap()
        .extract_recv_buffer();
    let returned = moved.wait().unwrap().extract_send_buffer();
    assert_eq!(returned, vec![1, 3, 5]);
    assert_eq!(echoed, returned);

    let mut receive = world
        .irecv((recv_count::<u8>(4), source(rank), tag(4)))
        .unwrap();
    let outgoing = [rank as u8; 4];
    world
        .issend((send_buf(&outgoing[..]), destination(rank), tag(4)))
        .unwrap()
        .wait()
        .unwrap();
    let values = receive.wait().unwrap().extract_recv_buffer();
    assert_eq!(values, outgoing);
}

fn completion_contracts(world: &Communicator) {
    let rank = world.rank();

    let mut receive = world
        .irecv((recv_count(2), source(rank), tag(6)))
        .unwrap();
    world
        .send((send_buf(&[7_u16, 8][..]), destination(rank), tag(6)))
        .unwrap();
    let mut completed = Status::empty();
    let values: Vec<u16> = receive
        .wait_into(&mut completed)
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(values, vec![7, 8]);
    assert_eq!(completed.tag(), 6);
    assert_eq!(completed.source(), rank);
    assert_eq!(completed.count::<u16>().unwrap(), 2);

    // nothing with this tag has been sent yet
    let mut receive = world
        .irecv((recv_count(1), source(rank), tag(8)))
        .unwrap();
    assert!(receive.test().unwrap().is_none());
    assert_eq!(receive.state(), State::Pending);
    world
        .send((send_buf(&9_i64), destination(rank), tag(8)))
        .unwrap();
    let (mut outputs, status) = loop {
        if let Some(done) = receive.test_with_status().unwrap() {
            break done;
        }
    };
    let values: Vec<i64> = outputs.extract_recv_buffer();
    assert_eq!(values, vec![9]);
    assert_eq!(status.tag(), 8);
    assert_eq!(receive.state(), State::Consumed);
    assert!(matches!(receive.test(), Err(Error::NotPending)));
}

fn buffered_sends(env: &mut Environment, world: &Communicator) {
    let rank = world.rank();
    let capacity = 64 + Environment::bsend_overhead();

    assert!(matches!(env.detach_buffer(), Err(Error::NoBufferAttached)));
    env.attach_buffer(vec![0; capacity]).unwrap();
    assert!(env.buffer_attached());

    world
        .bsend((send_buf(&[rank; 4][..]), destination(rank), tag(9)))
        .unwrap();
    let values: Vec<i32> = world
        .recv((source(rank), tag(9)))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(values, vec![rank; 4]);

    let detached = env.detach_buffer().unwrap();
    assert_eq!(detached.len(), capacity);
    assert!(!env.buffer_attached());
    assert!(matches!(env.detach_buffer(), Err(Error::NoBufferAttached)));
}

fn parameter_errors(world: &Communicator) {
    let empty: [i32; 0] = [];
    let missing = world.allreduce(send_buf(&empty[..]));
    assert!(matches!(
        missing,
        Err(Error::MissingParameter(ParameterType::Op))
    ));

    let duplicate = world.allgather((send_buf(&1_i32), send_buf(&2_i32)));
    assert!(matches!(
        duplicate,
        Err(Error::DuplicateParameter(ParameterType::SendBuf))
    ));

    let unexpected = world.ibarrier(root(0));
    assert!(matches!(
        unexpected,
        Err(Error::UnexpectedParameter(ParameterType::Root))
    ));

    // an explicit datatype needs its count
    let without_count = world.send((
        send_buf(&1_i32),
        destination(world.rank()),
        send_type(datatype_of::<i32>()),
    ));
    assert!(matches!(
        without_count,
        Err(Error::MissingParameter(ParameterType::SendCount))
    ));
}
