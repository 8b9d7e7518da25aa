use super::*;

#[tokio::test]
async fn events_arrive_in_emission_order() {
    let bus = EventBus::new(8);
    let emitter = bus.emitter().scoped("Named:probe", 1);

    emitter.emit("phase", "one").await.unwrap();
    emitter.emit("phase", "two").await.unwrap();
    emitter.emit("phase", "three").await.unwrap();

    let receiver = bus.receiver();
    let messages: Vec<String> = (0..3)
        .map(|_| match receiver.try_recv().unwrap() {
            Event::Progress(p) => p.message().to_string(),
            other => panic!("unexpected event: {other:?}"),
        })
        .collect();
    assert_eq!(messages, ["one", "two", "three"]);
}

#[tokio::test]
async fn scoped_emitter_stamps_node_and_step() {
    let bus = EventBus::new(4);
    let emitter = bus.emitter().scoped("Named:draft", 7);
    emitter.emit("llm", "token").await.unwrap();

    match bus.receiver().try_recv().unwrap() {
        Event::Progress(p) => {
            assert_eq!(p.node_id(), "Named:draft");
            assert_eq!(p.step(), 7);
            assert_eq!(p.scope(), "llm");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn listener_writes_rendered_lines_to_sink() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen();

    let emitter = bus.emitter().scoped("Named:a", 1);
    emitter.emit("work", "hello").await.unwrap();
    emitter
        .send(Event::Terminal(TerminalEvent::Completed { steps: 1 }))
        .await
        .unwrap();

    bus.shutdown().await;

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("hello"));
    assert!(lines[1].contains("completed"));
}

#[tokio::test]
async fn emit_fails_after_bus_dropped() {
    let emitter = {
        let bus = EventBus::new(4);
        bus.emitter()
    };
    let err = emitter.emit("scope", "late").await;
    assert!(err.is_err());
}
