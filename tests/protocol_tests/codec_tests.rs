//! Codec Tests
//!
//! Tests for request and response framing, encoding and decoding.

use std::io::Cursor;

use riakwire::datatype::{Datatype, DtOp};
use riakwire::protocol::{
    decode_request, decode_response, encode_request, encode_response, frame, read_request,
    read_response, split_frame, write_request, write_response, BucketReq, Content, DtUpdateReq,
    GetReq, GetResp, IndexRange, IndexReq, ListKeysResp, MessageCode, PutReq, Request, Response,
    HEADER_SIZE, LENGTH_SIZE, MAX_FRAME_SIZE,
};
use riakwire::{ProtocolErrorKind, RiakError};

fn assert_protocol(err: RiakError, expected: ProtocolErrorKind) {
    match err {
        RiakError::Protocol(kind) => match (&kind, &expected) {
            (ProtocolErrorKind::Malformed(_), ProtocolErrorKind::Malformed(_)) => {}
            _ => assert_eq!(kind, expected),
        },
        other => panic!("Expected protocol error {:?}, got {:?}", expected, other),
    }
}

// =============================================================================
// Frame Layout Tests
// =============================================================================

#[test]
fn test_ping_frame_layout() {
    let encoded = encode_request(&Request::Ping).unwrap();
    assert_eq!(&encoded[..], &[0, 0, 0, 1, 1]);
}

#[test]
fn test_length_covers_code_and_payload() {
    let encoded = encode_request(&Request::Get(GetReq {
        bucket: "b".into(),
        key: "k".into(),
        ..Default::default()
    }))
    .unwrap();

    let len = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
    assert_eq!(len, encoded.len() - 4);
    assert_eq!(encoded[4], MessageCode::GetReq as u8);
}

#[test]
fn test_request_codes_and_streaming() {
    let list = Request::ListKeys(BucketReq::default());
    assert!(list.message_code().is_request());
    assert!(!list.expected_response().is_request());
    assert!(list.is_streaming());
    assert!(!Request::Ping.is_streaming());
    assert_eq!(Request::Ping.expected_response(), MessageCode::PingResp);
}

#[test]
fn test_split_frame() {
    let bytes = frame(MessageCode::PutResp, b"abc").unwrap();
    let (code, payload) = split_frame(&bytes).unwrap();
    assert_eq!(code, 12);
    assert_eq!(payload, b"abc");
}

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_get() {
    let req = Request::Get(GetReq {
        bucket_type: "default".into(),
        bucket: "users".into(),
        key: "alice".into(),
        r: Some(2),
        pr: Some(u32::MAX - 2),
        head: true,
        ..Default::default()
    });
    let decoded = decode_request(&encode_request(&req).unwrap()).unwrap();
    assert_eq!(decoded, req);
}

#[test]
fn test_encode_decode_put_with_content() {
    let mut content = Content::new(b"{\"a\":1}".to_vec(), "application/json");
    content.indexes.push(("age_int".into(), "42".into()));
    content.usermeta.push(("owner".into(), "bob".into()));

    let req = Request::Put(PutReq {
        bucket_type: "default".into(),
        bucket: "users".into(),
        key: None,
        vclock: Some(vec![1, 2, 3]),
        content,
        w: Some(3),
        return_body: true,
        ..Default::default()
    });
    let decoded = decode_request(&encode_request(&req).unwrap()).unwrap();
    assert_eq!(decoded, req);
}

#[test]
fn test_encode_decode_index_and_datatype() {
    let index = Request::Index(IndexReq {
        bucket_type: "default".into(),
        bucket: "users".into(),
        index: "age_int".into(),
        range: IndexRange::Range {
            start: "10".into(),
            end: "20".into(),
        },
        return_terms: true,
        max_results: Some(5),
        continuation: None,
        timeout: None,
    });
    assert_eq!(decode_request(&encode_request(&index).unwrap()).unwrap(), index);

    let update = Request::DtUpdate(DtUpdateReq {
        bucket_type: "counters".into(),
        bucket: "hits".into(),
        key: Some("page".into()),
        context: None,
        op: DtOp::increment(5),
        w: None,
        dw: None,
        pw: None,
        return_body: true,
        timeout: None,
        include_context: None,
    });
    assert_eq!(decode_request(&encode_request(&update).unwrap()).unwrap(), update);
}

#[test]
fn test_bucket_requests_keep_their_codes() {
    let req = BucketReq {
        bucket_type: "default".into(),
        bucket: "b".into(),
        timeout: None,
    };
    for request in [
        Request::ListKeys(req.clone()),
        Request::GetBucket(req.clone()),
        Request::ResetBucket(req),
    ] {
        let encoded = encode_request(&request).unwrap();
        assert_eq!(encoded[4], request.message_code() as u8);
        assert_eq!(decode_request(&encoded).unwrap(), request);
    }
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_empty_body_responses() {
    for response in [
        Response::Pong,
        Response::Deleted,
        Response::SetBucket,
        Response::ResetBucket,
    ] {
        let encoded = encode_response(&response).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(decode_response(&encoded).unwrap(), response);
    }
}

#[test]
fn test_encode_decode_error_response() {
    let encoded = encode_response(&Response::error(7, "overload")).unwrap();
    match decode_response(&encoded).unwrap() {
        Response::Error(err) => {
            assert_eq!(err.errcode, 7);
            assert_eq!(err.errmsg, "overload");
        }
        other => panic!("Expected error response, got {:?}", other),
    }
}

#[test]
fn test_encode_decode_get_response() {
    let resp = Response::Get(GetResp {
        content: vec![Content::new(b"v".to_vec(), "text/plain")],
        vclock: Some(vec![9]),
        unchanged: false,
    });
    assert_eq!(decode_response(&encode_response(&resp).unwrap()).unwrap(), resp);
}

#[test]
fn test_encode_decode_datatype_response() {
    let mut counter = Datatype::Counter(0);
    counter.apply(&DtOp::increment(3)).unwrap();
    let resp = Response::DtFetch(riakwire::protocol::DtFetchResp {
        context: Some(b"ctx".to_vec()),
        value: Some(counter),
    });
    assert_eq!(decode_response(&encode_response(&resp).unwrap()).unwrap(), resp);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_decode_unknown_message_code() {
    let bytes = frame_raw(0xC8, &[]);
    let err = decode_response(&bytes).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::UnknownMessageType(0xC8));
}

#[test]
fn test_decode_truncated_header() {
    let err = decode_response(&[0, 0, 0]).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Truncated);
}

#[test]
fn test_decode_truncated_payload() {
    let full = encode_response(&Response::error(1, "boom")).unwrap();
    let err = decode_response(&full[..full.len() - 2]).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Truncated);
}

#[test]
fn test_decode_zero_length_frame() {
    let err = decode_response(&[0, 0, 0, 0]).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));
}

#[test]
fn test_decode_oversized_frame() {
    let len = (MAX_FRAME_SIZE + 1).to_be_bytes();
    let bytes = [len[0], len[1], len[2], len[3], 10];
    let err = decode_response(&bytes).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));
}

#[test]
fn test_encode_rejects_oversized_request() {
    let mut buffer = Vec::new();
    let req = Request::Put(PutReq {
        bucket: "big".into(),
        key: Some("blob".into()),
        content: Content::new(vec![0u8; MAX_FRAME_SIZE as usize + 10], "application/octet-stream"),
        ..Default::default()
    });

    let err = encode_request(&req).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));

    // Nothing reaches the stream when the frame is refused.
    assert!(write_request(&mut buffer, &req).is_err());
    assert!(buffer.is_empty());
}

#[test]
fn test_frame_size_limit_is_inclusive() {
    let at_limit = vec![0u8; MAX_FRAME_SIZE as usize - 1];
    let bytes = frame(MessageCode::PutResp, &at_limit).unwrap();
    assert_eq!(bytes.len(), LENGTH_SIZE + MAX_FRAME_SIZE as usize);
    assert!(split_frame(&bytes).is_ok());

    let over_limit = vec![0u8; MAX_FRAME_SIZE as usize];
    let err = frame(MessageCode::PutResp, &over_limit).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));
}

#[test]
fn test_decode_trailing_bytes() {
    let mut bytes = encode_response(&Response::Pong).unwrap().to_vec();
    bytes.push(0);
    let err = decode_response(&bytes).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));
}

#[test]
fn test_decode_payload_on_empty_message() {
    let bytes = frame_raw(MessageCode::PingResp as u8, &[1, 2]);
    let err = decode_response(&bytes).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));
}

#[test]
fn test_decode_garbage_payload() {
    let bytes = frame_raw(MessageCode::GetResp as u8, &[0xFF; 3]);
    let err = decode_response(&bytes).unwrap_err();
    assert!(err.is_protocol());
}

#[test]
fn test_decode_wrong_direction() {
    let request_bytes = encode_request(&Request::Ping).unwrap();
    let err = decode_response(&request_bytes).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));

    let response_bytes = encode_response(&Response::Pong).unwrap();
    let err = decode_request(&response_bytes).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Malformed(String::new()));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_write_read_request() {
    let mut buffer = Vec::new();
    write_request(&mut buffer, &Request::ServerInfo).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_request(&mut cursor).unwrap(), Request::ServerInfo);
}

#[test]
fn test_stream_multiple_streamed_responses() {
    let frames = [
        Response::ListKeys(ListKeysResp {
            keys: vec!["a".into(), "b".into()],
            done: false,
        }),
        Response::ListKeys(ListKeysResp {
            keys: vec!["c".into()],
            done: false,
        }),
        Response::ListKeys(ListKeysResp {
            keys: vec![],
            done: true,
        }),
    ];

    let mut buffer = Vec::new();
    for resp in &frames {
        write_response(&mut buffer, resp).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    let mut keys = Vec::new();
    loop {
        let resp = read_response(&mut cursor).unwrap();
        let done = resp.is_done();
        if let Response::ListKeys(chunk) = resp {
            keys.extend(chunk.keys);
        }
        if done {
            break;
        }
    }
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_stream_eof_before_frame_is_transient() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let err = read_response(&mut cursor).unwrap_err();
    assert!(err.is_transient());
}

#[test]
fn test_stream_eof_mid_frame_is_truncated() {
    let bytes = encode_response(&Response::error(1, "partial")).unwrap();
    let mut cursor = Cursor::new(bytes[..bytes.len() - 1].to_vec());
    let err = read_response(&mut cursor).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Truncated);

    let mut cursor = Cursor::new(vec![0, 0]);
    let err = read_response(&mut cursor).unwrap_err();
    assert_protocol(err, ProtocolErrorKind::Truncated);
}

/// Frame with an arbitrary code byte
fn frame_raw(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = ((payload.len() + 1) as u32).to_be_bytes().to_vec();
    bytes.push(code);
    bytes.extend_from_slice(payload);
    bytes
}
