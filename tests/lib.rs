use mechalink::{
    data,
    registers::{Layout, RegisterMap},
    Access, SimulatedBus, SentFrame,
    Link, LinkConfig, LinkError, Message, ReceiveBuffer, Received, Transmitted, WriteQueue,
    UserParameters, ParameterPacking, DiscoveryConfig, DiscoveryContext, ModuleDescriptor, Strides, Instances,
    discover, receive, MAX_BURST,
    };
use bilge::prelude::*;


fn map() -> RegisterMap {
    RegisterMap::new(Layout::Station, 0x4000, 0x100, 4, 0)
}
fn link() -> Link<SimulatedBus> {
    Link::new(SimulatedBus::new(map()), map(), LinkConfig::default())
}
fn payload(len: usize) -> Vec<u8> {
    (0 .. len).map(|i|  (i * 7 + 3) as u8).collect()
}


#[test]
fn word_packing_round_trip() {
    for len in 0 ..= 255 {
        let original = payload(len);
        let words = original.chunks(4)
            .map(|chunk|  data::pack_word(chunk).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(words.len(), data::word_count(len));

        let mut rebuilt = vec![0; len];
        for (chunk, word) in rebuilt.chunks_mut(4).zip(&words) {
            data::unpack_word(*word, chunk).unwrap();
        }
        assert_eq!(rebuilt, original, "length {}", len);
    }
}

#[test]
fn loopback_round_trip() {
    let mut link = link();
    for len in 1 ..= 255 {
        let original = payload(len);
        link.enqueue(&original, u5::new((len % 32) as u8)).unwrap();
        link.bus_mut().clear_accesses();
        assert_eq!(link.flush().unwrap(), Transmitted {sent: 1, bytes: len});
        assert_eq!(link.bus().writes_to(link.map().tx_data.address).len(), data::word_count(len));

        link.bus_mut().loop_back();
        link.bus_mut().clear_accesses();
        assert_eq!(link.poll().unwrap(), Received {messages: 1, bytes: len});
        assert_eq!(link.bus().reads_of(link.map().rx_data.address), data::word_count(len));
        assert_eq!(
            link.received().to_messages().unwrap(),
            vec![Message::new(&original, u5::new((len % 32) as u8)).unwrap()],
            );
        link.bus_mut().complete_burst();
    }
}

#[test]
fn example_scenario() {
    let mut link = link();
    link.enqueue(&[0x11, 0x22, 0x33, 0x44, 0x55], u5::new(2)).unwrap();
    link.enqueue(&[0xaa, 0xbb, 0xcc], u5::new(3)).unwrap();
    assert_eq!(link.flush().unwrap(), Transmitted {sent: 2, bytes: 8});

    let map = link.map().clone();
    let station = map.tx_station.unwrap().address;
    assert_eq!(link.bus().accesses(), &[
        Access::Write {address: map.tx_data.address, value: 0x4433_2211},
        Access::Write {address: map.tx_data.address, value: 0x0000_0055},
        Access::Write {address: map.tx_count.address, value: 5},
        Access::Write {address: station, value: 2},
        Access::Read {address: map.mode.address, value: 0},
        Access::Write {address: map.tx_data.address, value: 0x00cc_bbaa},
        Access::Write {address: map.tx_count.address, value: 3},
        Access::Write {address: station, value: 3},
        Access::Read {address: map.mode.address, value: 0},
        ]);
}

#[test]
fn burst_clamp() {
    let mut bus = SimulatedBus::new(map());
    let mut queue = WriteQueue::<20>::new();
    for i in 0 .. 20u8 {
        queue.enqueue(&[i; 5], u5::new(i % 32)).unwrap();
    }
    let done = queue.flush(&mut bus, &map(), MAX_BURST).unwrap();
    assert_eq!(done.sent, 16);
    assert_eq!(
        bus.sent().iter().map(|frame| frame.data[0]).collect::<Vec<_>>(),
        (0 .. 16).collect::<Vec<_>>(),
        );
    assert!(queue.is_empty());
}

#[test]
fn partial_progress() {
    let mut link = link();
    link.bus_mut().set_send_slots(4);
    for i in 0 .. 10u8 {
        link.enqueue(&[i, i], u5::new(1)).unwrap();
    }
    let interrupted = link.flush().unwrap_err();
    assert!(matches!(interrupted.error, LinkError::TxSendCountFifo));
    assert_eq!(interrupted.code(), -214);
    assert_eq!(interrupted.done.sent, 4);
    assert_eq!(link.bus().sent().len(), 4);
    assert!(link.pending().is_empty());
}

#[test]
fn capacity_enforcement() {
    let mut bus = SimulatedBus::new(map());
    bus.inject(&[0xee; 25], u5::new(1));
    let mut buffer = ReceiveBuffer::new(2, 10);

    let interrupted = receive(&mut bus, &map(), &mut buffer).unwrap_err();
    assert!(matches!(interrupted.error, LinkError::RxArraySize));
    assert_eq!(interrupted.code(), -1140);
    assert_eq!(buffer.capacity(), 20);
    assert_eq!(buffer.bytes(), 0);
    assert_eq!(bus.reads_of(map().rx_data.address), 0);
}

#[test]
fn zero_length_rejection() {
    let mut link = link();
    link.bus_mut().inject_raw(0, 3, &[]);
    let interrupted = link.poll().unwrap_err();
    assert!(matches!(interrupted.error, LinkError::RxPacketSizeZero));
    assert_eq!(interrupted.code(), -1120);
    assert_eq!(interrupted.done.messages, 0);
    assert!(link.received().is_empty());
}

#[test]
fn no_message_fast_path() {
    let mut link = link();
    assert_eq!(link.poll().unwrap(), Received {messages: 0, bytes: 0});
    assert!(link.received().is_empty());
    assert_eq!(link.bus().accesses(), &[Access::Read {address: map().mode.address, value: 0}]);
}

#[test]
fn discovered_instance_exchange() {
    let descriptor = ModuleDescriptor::parse(&[0x20, 0, 0, 2, 0x00, 0x40, 11, 0x00, 0x07, 0, 0, 0]).unwrap();
    let strides = Strides {register: [0x100, 0x40], instance: [4, 0x10]};
    let mut instances = Instances::new();
    let count = discover(
        &mut DiscoveryContext::new(),
        &DiscoveryConfig::new(0x20),
        &descriptor, &strides, "hm2_7i92.0", &mut instances,
        ).unwrap();
    assert_eq!(count, 2);

    let map = instances.find("hm2_7i92.0.mechatrolink.1").unwrap().map.clone();
    let mut link = Link::new(SimulatedBus::new(map.clone()), map, LinkConfig::default());
    link.setup(&UserParameters {mode: 0x11, master_address: 0x22, .. UserParameters::default()}).unwrap();
    assert_eq!(link.bus().register(0x4704), Some(0x0022_0011));

    link.enqueue(&[1, 2, 3], u5::new(5)).unwrap();
    let (transmitted, _) = link.cycle().into_result().unwrap();
    assert_eq!(transmitted.sent, 1);
    assert_eq!(link.bus().sent(), &[SentFrame {data: vec![1, 2, 3], station: Some(u5::new(5))}]);
}

#[test]
fn legacy_parameter_packing() {
    let config = LinkConfig {packing: ParameterPacking::LegacyAnd, .. LinkConfig::default()};
    let mut link = Link::new(SimulatedBus::new(map()), map(), config);
    link.setup(&UserParameters {mode: 0xffff, master_address: 0xffff, .. UserParameters::default()}).unwrap();
    assert_eq!(link.bus().register(map().user[0].address), Some(0));
}
