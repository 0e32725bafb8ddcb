//! Trigger evaluation through the session API: publish matching with
//! mandatory content, time schedules, inbound routing.

use std::time::{Duration, SystemTime};

use acomms_codec::{Codec, FieldDescriptor, MessageDescriptor, TriggerRule};

fn fields() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::int("depth", 0, 5000)]
}

fn loaded_codec() -> Codec {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut codec = Codec::new();
    codec
        .load(vec![
            MessageDescriptor::new("NAV_ALL", 1, TriggerRule::on_publish("nav"), fields()),
            MessageDescriptor::new(
                "NAV_GPS",
                2,
                TriggerRule::on_publish_containing("nav", "GPS"),
                fields(),
            ),
            MessageDescriptor::new(
                "STATUS",
                14,
                TriggerRule::OnTime { interval_secs: 5 },
                fields(),
            )
            .with_in_var("ACOMMS_STATUS_IN"),
        ])
        .unwrap();
    codec
}

fn at(codec: &Codec, secs: f64) -> SystemTime {
    codec.start_time() + Duration::from_secs_f64(secs)
}

#[test]
fn test_publish_trigger_matrix() {
    let codec = loaded_codec();

    let due: Vec<u32> = codec
        .publish_triggers("nav", "lat=42.35,lon=-70.95")
        .into_iter()
        .collect();
    assert_eq!(due, vec![1]);

    let due: Vec<u32> = codec
        .publish_triggers("nav", "GPS,lat=42.35,lon=-70.95")
        .into_iter()
        .collect();
    assert_eq!(due, vec![1, 2]);

    assert!(codec.publish_triggers("ctd", "GPS").is_empty());
}

#[test]
fn test_time_trigger_interval_boundaries() {
    let mut codec = loaded_codec();

    let t1 = at(&codec, 4.9);
    let t2 = at(&codec, 5.1);
    let t3 = at(&codec, 9.9);
    let t4 = at(&codec, 10.1);

    assert!(codec.time_triggers(t1).is_empty());
    assert!(codec.time_triggers(t2).contains(&14));
    assert!(codec.time_triggers(t3).is_empty());
    assert!(codec.time_triggers(t4).contains(&14));
    assert_eq!(codec.registry().by_id(14).unwrap().fire_count(), 2);
}

#[test]
fn test_time_trigger_never_fires_publish_messages() {
    let mut codec = loaded_codec();
    let far = at(&codec, 1000.0);
    let due = codec.time_triggers(far);
    assert_eq!(due.into_iter().collect::<Vec<u32>>(), vec![14]);
}

#[test]
fn test_incoming_routing() {
    let codec = loaded_codec();
    assert_eq!(codec.incoming_message("ACOMMS_STATUS_IN"), Some(14));
    assert_eq!(codec.incoming_message("nav"), None);
}
