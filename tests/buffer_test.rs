use std::sync::Arc;

use vircol::{AcquireMode, Buffer, Object};

#[test]
fn test_exclusive_write_requires_sole_handle() {
    let mut buf = Buffer::new(16).unwrap();
    assert_eq!(buf.mode(), AcquireMode::Exclusive);
    buf.write_at(0, &[1, 2, 3]).unwrap();

    let copy = buf.clone();
    assert!(buf.write_at(0, &[9]).is_err());
    assert!(copy.write_at(0, &[9]).is_err());

    drop(copy);
    buf.write_at(0, &[9]).unwrap();
    assert_eq!(buf.as_slice().unwrap()[0], 9);
}

#[test]
fn test_shared_handles_may_write_concurrently() {
    let buf = Buffer::new(256).unwrap();
    let handles: Vec<Buffer> = (0..4).map(|_| buf.share()).collect();
    assert_eq!(buf.shared_refs(), 4);
    assert_eq!(buf.total_refs(), 5);

    std::thread::scope(|scope| {
        for (i, handle) in handles.iter().enumerate() {
            scope.spawn(move || {
                let chunk = vec![i as u8 + 1; 64];
                handle.write_at(i * 64, &chunk).unwrap();
            });
        }
    });

    let bytes = buf.as_slice().unwrap();
    for i in 0..4 {
        assert!(bytes[i * 64..(i + 1) * 64].iter().all(|&b| b == i as u8 + 1));
    }
}

#[test]
fn test_resize_only_when_unique() {
    let mut buf = Buffer::new(8).unwrap();
    let shared = buf.share();
    assert!(!buf.is_resizable());
    assert!(buf.resize(32).is_err());
    drop(shared);
    buf.resize(32).unwrap();
    assert_eq!(buf.len(), 32);
    // Grown region is zero-filled.
    assert!(buf.as_slice().unwrap()[8..].iter().all(|&b| b == 0));
}

#[test]
fn test_resize_through_shared_handle_rejected() {
    let buf = Buffer::new(8).unwrap();
    let mut shared = buf.share();
    drop(buf);
    // Sole handle, but acquired shared: still no resizing.
    assert!(shared.resize(16).is_err());
}

#[test]
fn test_view_tracks_parent_bytes() {
    let mut parent = Buffer::new(32).unwrap();
    {
        let bytes = parent.as_mut_slice().unwrap();
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
    }
    let view = parent.view(8, 16).unwrap();
    assert_eq!(view.len(), 16);
    assert_eq!(view.as_slice().unwrap()[0], 8);
    assert_eq!(view.as_slice().unwrap()[15], 23);

    // The view holds a shared acquisition on the parent.
    assert_eq!(parent.shared_refs(), 1);
    drop(view);
    assert_eq!(parent.shared_refs(), 0);
}

#[test]
fn test_external_buffer_releases_owner() {
    let owner = Arc::new(vec![7u8; 10]);
    let buf = Buffer::external(Arc::clone(&owner));
    assert_eq!(Arc::strong_count(&owner), 2);
    assert_eq!(buf.as_slice().unwrap().len(), 10);
    assert!(!buf.is_writable());
    drop(buf);
    assert_eq!(Arc::strong_count(&owner), 1);
}

#[test]
fn test_object_buffer_refcounts() {
    let payload: Object = Arc::new("hello".to_string());
    let mut buf = Buffer::objects(vec![Some(Arc::clone(&payload)), None, None]);
    assert!(buf.contains_objects());
    assert_eq!(Arc::strong_count(&payload), 2);

    buf.set_object(2, Some(Arc::clone(&payload))).unwrap();
    assert_eq!(Arc::strong_count(&payload), 3);

    buf.set_object(0, None).unwrap();
    assert_eq!(Arc::strong_count(&payload), 2);

    drop(buf);
    assert_eq!(Arc::strong_count(&payload), 1);
}

#[test]
fn test_verify_integrity() {
    let buf = Buffer::new(64).unwrap();
    buf.verify_integrity().unwrap();
    let view = buf.view(0, 64).unwrap();
    view.verify_integrity().unwrap();
}
