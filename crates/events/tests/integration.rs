//! Integration tests for events

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use appxtract_errors::UnpackError;
    use appxtract_events::*;
    use appxtract_types::ContainerKind;

    struct Component {
        event_sender: Option<EventSender>,
    }

    impl EventEmitter for Component {
        fn event_sender(&self) -> Option<&EventSender> {
            self.event_sender.as_ref()
        }
    }

    fn listening() -> (Component, EventReceiver) {
        let (tx, rx) = channel();
        (
            Component {
                event_sender: Some(tx),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_emit_wraps_with_meta() {
        let (component, mut rx) = listening();

        component.emit_unpack(UnpackEvent::ItemStarted {
            source: PathBuf::from("App.msix"),
            kind: ContainerKind::Package,
        });
        component.emit_image(ImageEvent::BuildFailed {
            output: PathBuf::from("apps.vhdx"),
            failure: FailureContext::new(None::<String>, "tool exited 1", None::<String>, false),
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.meta.level, EventLevel::Debug);
        assert_eq!(first.meta.source, EventSource::Unpack);
        assert_eq!(first.meta.tracing_level(), tracing::Level::DEBUG);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.meta.level, EventLevel::Error);
        assert_eq!(second.meta.source.as_str(), "image");
        assert_ne!(first.meta.event_id, second.meta.event_id);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (component, rx) = listening();
        drop(rx);

        // Should not panic when receiver is dropped
        component.emit_unpack(UnpackEvent::ItemSkipped {
            path: PathBuf::from("readme.txt"),
        });
    }

    #[test]
    fn test_no_sender_is_silent() {
        let component = Component { event_sender: None };
        component.emit_image(ImageEvent::StagingRemoved {
            path: PathBuf::from("stage"),
        });
    }

    #[tokio::test]
    async fn test_item_failure_is_a_warning() {
        let (component, mut rx) = listening();
        let err = UnpackError::corrupt("Broken.msix", "missing manifest");
        component.emit_unpack(UnpackEvent::ItemFailed {
            source: PathBuf::from("Broken.msix"),
            failure: FailureContext::from_error(&err),
        });

        let message = rx.recv().await.unwrap();
        assert_eq!(message.meta.level, EventLevel::Warn);
        assert_eq!(message.meta.source, EventSource::Unpack);
        match message.event {
            AppEvent::Unpack(UnpackEvent::ItemFailed { failure, .. }) => {
                assert_eq!(
                    failure.code.as_deref(),
                    Some("unpack.container_corrupt_or_unsigned")
                );
                assert!(failure.hint.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Image(ImageEvent::StagingRemoved {
            path: PathBuf::from("/tmp/stage"),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "image");
        assert_eq!(json["event"]["type"], "staging_removed");
    }
}
