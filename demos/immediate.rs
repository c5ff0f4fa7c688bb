#![deny(warnings)]

use kamping::prelude::*;

fn main() {
    let env = Environment::new(InitMode::InitFinalize).unwrap();
    let world = env.world().unwrap();
    let rank = world.rank();
    let size = world.size();
    let next = (rank + 1) % size;
    let previous = (rank + size - 1) % size;

    // the send buffer is moved into the operation and handed back on completion
    let message: Vec<u32> = (0..(rank as u32 + 4)).collect();
    let mut pending = world
        .isend((send_buf_out(message), destination(next), tag(7)))
        .unwrap();

    let mut last_status = Status::empty();
    let received = world
        .recv((source::<u32>(previous), tag(7), status(&mut last_status)))
        .unwrap()
        .extract_recv_buffer();
    assert_eq!(received, (0..(previous as u32 + 4)).collect::<Vec<_>>());
    assert_eq!(last_status.source(), previous);
    assert_eq!(last_status.count::<u32>().unwrap(), received.len());

    let returned = pending.wait().unwrap().extract_send_buffer();
    assert_eq!(returned, (0..(rank as u32 + 4)).collect::<Vec<_>>());
    assert!(pending.wait().is_err());

    // caller managed requests are completed by the caller
    let value = rank as f64;
    let mut incoming = 0.0_f64;
    let mut requests = [Request::new(), Request::new()];
    {
        let [first, second] = &mut requests;
        let mut receive = world
            .irecv((recv_buf(&mut incoming), source(previous), request(first)))
            .unwrap();
        let mut send = world
            .issend((send_buf(&value), destination(next), request(second)))
            .unwrap();
        assert!(!receive.owns_request());
        assert!(send.wait().is_err());
        unsafe {
            let _ = receive.extract().unwrap();
            let _ = send.extract().unwrap();
        }
    }
    Request::wait_all(&mut requests).unwrap();
    assert_eq!(incoming, previous as f64);

    let mut barrier = world.ibarrier(()).unwrap();
    barrier.wait().unwrap();

    assert!(world.iprobe(tag(99)).unwrap().is_none());
    assert!(world.try_recv::<u8>(tag(99)).unwrap().is_none());

    let outgoing = [1_u8, 2, 3];
    let mut to_self = world
        .isend((send_buf(&outgoing[..]), destination(rank), tag(99)))
        .unwrap();
    let probed = world.probe(tag(99)).unwrap();
    assert_eq!(probed.count::<u8>().unwrap(), 3);
    let bytes = world
        .try_recv::<u8>(tag(99))
        .unwrap()
        .map(|mut result| result.extract_recv_buffer());
    assert_eq!(bytes, Some(vec![1, 2, 3]));
    to_self.wait().unwrap();
}
