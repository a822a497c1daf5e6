use sdp::direction::Direction;
use sdp::parameters::{DtlsRole, FmtpValue};
use sdp::SessionDescription;

const CHROME_AUDIO_OFFER: &str = "v=0
o=- 863426017819471768 2 IN IP4 127.0.0.1
s=-
t=0 0
a=group:BUNDLE audio
a=msid-semantic: WMS TF6VRif1dxuAfe5uefrV2953LhUZt1keYvxU
m=audio 45076 UDP/TLS/RTP/SAVPF 111 103 104 9 0 8 106 105 13 110 112 113 126
c=IN IP4 192.168.99.58
a=rtcp:9 IN IP4 0.0.0.0
a=candidate:1039001212 1 udp 2122194687 192.168.99.58 45076 typ host generation 0 network-id 1 network-cost 10
a=candidate:1936595596 1 tcp 1518214911 192.168.99.58 9 typ host tcptype active generation 0 network-id 1 network-cost 10
a=ice-ufrag:5+Ix
a=ice-pwd:uK8IlylxzDMUhrkVzdmj0M+v
a=ice-options:trickle
a=fingerprint:sha-256 6B:8B:5D:EA:59:04:20:23:29:C8:87:1C:CC:87:32:BE:DD:8C:66:A5:8E:50:55:EA:8C:D3:B6:5C:09:5E:D6:BC
a=setup:actpass
a=mid:audio
a=extmap:1 urn:ietf:params:rtp-hdrext:ssrc-audio-level
a=sendrecv
a=rtcp-mux
a=rtpmap:111 opus/48000/2
a=rtcp-fb:111 transport-cc
a=fmtp:111 minptime=10;useinbandfec=1
a=rtpmap:103 ISAC/16000
a=rtpmap:104 ISAC/32000
a=rtpmap:9 G722/8000
a=rtpmap:0 PCMU/8000
a=rtpmap:8 PCMA/8000
a=rtpmap:106 CN/32000
a=rtpmap:105 CN/16000
a=rtpmap:13 CN/8000
a=rtpmap:110 telephone-event/48000
a=rtpmap:112 telephone-event/32000
a=rtpmap:113 telephone-event/16000
a=rtpmap:126 telephone-event/8000
a=ssrc:1944796561 cname:/vC4ULAr8vHNjXmq
a=ssrc:1944796561 msid:TF6VRif1dxuAfe5uefrV2953LhUZt1keYvxU ec1eb8de-8df8-4956-ae81-879e5d062d12
a=ssrc:1944796561 mslabel:TF6VRif1dxuAfe5uefrV2953LhUZt1keYvxU
a=ssrc:1944796561 label:ec1eb8de-8df8-4956-ae81-879e5d062d12
";

const FIREFOX_AUDIO_OFFER: &str = "v=0
o=mozilla...THIS_IS_SDPARTA-58.0.1 4934139885953732403 1 IN IP4 0.0.0.0
s=-
t=0 0
a=fingerprint:sha-256 EB:A9:3E:50:D7:E3:B3:86:0F:7B:01:C1:EB:D6:AF:E4:97:DE:15:05:A8:DE:7B:83:56:C7:4B:6E:9D:75:D4:17
a=group:BUNDLE sdparta_0
a=ice-options:trickle
a=msid-semantic:WMS *
m=audio 45274 UDP/TLS/RTP/SAVPF 109 9 0 8 101
c=IN IP4 192.168.99.58
a=candidate:0 1 UDP 2122187007 192.168.99.58 45274 typ host
a=candidate:1 1 UDP 2122252543 2a02:a03f:3eb0:e000:b0aa:d60a:cff2:933c 47387 typ host
a=candidate:2 1 TCP 2105458943 192.168.99.58 9 typ host tcptype active
a=candidate:3 1 TCP 2105524479 2a02:a03f:3eb0:e000:b0aa:d60a:cff2:933c 9 typ host tcptype active
a=sendrecv
a=end-of-candidates
a=extmap:1/sendonly urn:ietf:params:rtp-hdrext:ssrc-audio-level
a=extmap:2 urn:ietf:params:rtp-hdrext:sdes:mid
a=fmtp:109 maxplaybackrate=48000;stereo=1;useinbandfec=1
a=fmtp:101 0-15
a=ice-pwd:f9b83487285016f7492197a5790ceee5
a=ice-ufrag:403a81e1
a=mid:sdparta_0
a=msid:{dee771c7-671a-451e-b847-f86f8e87c7d8} {12692dea-686c-47ca-b3e9-48f38fc92b78}
a=rtcp:38612 IN IP4 192.168.99.58
a=rtcp-mux
a=rtpmap:109 opus/48000/2
a=rtpmap:9 G722/8000/1
a=rtpmap:0 PCMU/8000
a=rtpmap:8 PCMA/8000
a=rtpmap:101 telephone-event/8000
a=setup:actpass
a=ssrc:882128807 cname:{ed463ac5-dabf-44d4-8b9f-e14318427b2b}
";

const THREE_MEDIA_OFFER: &str = "v=0\r
o=- 4215775240577818151 2 IN IP4 0.0.0.0\r
s=-\r
t=0 0\r
a=group:BUNDLE audio video data\r
a=msid-semantic:WMS *\r
m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r
c=IN IP4 0.0.0.0\r
a=sendrecv\r
a=mid:audio\r
a=rtcp:9 IN IP4 0.0.0.0\r
a=rtcp-mux\r
a=ssrc:1831097322 cname:s6dKkmMHOVZCIKwg\r
a=rtpmap:111 opus/48000/2\r
a=fmtp:111 minptime=10;useinbandfec=1\r
a=rtpmap:0 PCMU/8000\r
a=candidate:1 1 udp 2130706431 10.0.1.3 53211 typ host\r
a=end-of-candidates\r
a=ice-ufrag:EsAw\r
a=ice-pwd:P2uYro0UCOQ4zxjKXaWCBui1\r
a=fingerprint:sha-256 6B:8B:5D:EA:59:04:20:23:29:C8:87:1C:CC:87:32:BE:DD:8C:66:A5:8E:50:55:EA:8C:D3:B6:5C:09:5E:D6:BC\r
a=setup:actpass\r
m=video 9 UDP/TLS/RTP/SAVPF 97\r
c=IN IP4 0.0.0.0\r
a=sendrecv\r
a=mid:video\r
a=rtcp:9 IN IP4 0.0.0.0\r
a=rtcp-mux\r
a=rtpmap:97 VP8/90000\r
a=rtcp-fb:* nack\r
a=rtcp-fb:97 nack pli\r
a=candidate:1 1 udp 2130706431 10.0.1.3 53211 typ host\r
a=end-of-candidates\r
a=ice-ufrag:EsAw\r
a=ice-pwd:P2uYro0UCOQ4zxjKXaWCBui1\r
a=fingerprint:sha-256 6B:8B:5D:EA:59:04:20:23:29:C8:87:1C:CC:87:32:BE:DD:8C:66:A5:8E:50:55:EA:8C:D3:B6:5C:09:5E:D6:BC\r
a=setup:actpass\r
m=application 9 DTLS/SCTP webrtc-datachannel\r
c=IN IP4 0.0.0.0\r
a=mid:data\r
a=sctpmap:5000 webrtc-datachannel 256\r
a=sctp-port:5000\r
a=max-message-size:65536\r
a=candidate:1 1 udp 2130706431 10.0.1.3 53211 typ host\r
a=end-of-candidates\r
a=ice-ufrag:EsAw\r
a=ice-pwd:P2uYro0UCOQ4zxjKXaWCBui1\r
a=fingerprint:sha-256 6B:8B:5D:EA:59:04:20:23:29:C8:87:1C:CC:87:32:BE:DD:8C:66:A5:8E:50:55:EA:8C:D3:B6:5C:09:5E:D6:BC\r
a=setup:actpass\r
";

#[test]
fn test_chrome_audio_offer() {
    let d = SessionDescription::parse(CHROME_AUDIO_OFFER).unwrap();
    assert_eq!(d.version, 0);
    assert_eq!(d.origin, "- 863426017819471768 2 IN IP4 127.0.0.1");
    assert_eq!(d.group.len(), 1);
    assert_eq!(d.group[0].semantic, "BUNDLE");
    assert_eq!(d.group[0].items, vec!["audio"]);
    assert_eq!(d.media.len(), 1);

    let media = &d.media[0];
    assert_eq!(media.kind, "audio");
    assert_eq!(media.port, 45076);
    assert_eq!(media.profile, "UDP/TLS/RTP/SAVPF");
    assert_eq!(media.host.as_deref(), Some("192.168.99.58"));
    assert_eq!(media.direction, Some(Direction::Sendrecv));
    assert_eq!(media.rtp.mux_id, "audio");
    assert_eq!(media.rtcp_port, Some(9));
    assert_eq!(media.rtcp_host.as_deref(), Some("0.0.0.0"));
    assert!(media.rtcp_mux);

    assert_eq!(media.ice_candidates.len(), 2);
    assert!(!media.ice_candidates_complete);
    assert_eq!(media.ice.username_fragment.as_deref(), Some("5+Ix"));
    assert_eq!(
        media.ice.password.as_deref(),
        Some("uK8IlylxzDMUhrkVzdmj0M+v")
    );
    assert_eq!(media.ice_options.as_deref(), Some("trickle"));

    let dtls = media.dtls.as_ref().unwrap();
    assert_eq!(dtls.role, DtlsRole::Auto);
    assert_eq!(dtls.fingerprints.len(), 1);
    assert_eq!(dtls.fingerprints[0].algorithm, "sha-256");

    assert_eq!(media.rtp.codecs.len(), 13);
    let opus = media.codec(111).unwrap();
    assert_eq!(opus.mime_type, "audio/opus");
    assert_eq!(opus.clock_rate, 48000);
    assert_eq!(opus.channels, Some(2));
    assert_eq!(opus.rtcp_feedback.len(), 1);
    assert_eq!(opus.rtcp_feedback[0].typ, "transport-cc");
    assert_eq!(opus.parameters.len(), 2);
    assert_eq!(opus.parameters[0].key, "minptime");
    assert_eq!(opus.parameters[0].value, Some(FmtpValue::Integer(10)));

    let pcmu = media.codec(0).unwrap();
    assert_eq!(pcmu.mime_type, "audio/PCMU");
    assert_eq!(pcmu.channels, Some(1));

    assert_eq!(media.ssrc.len(), 1);
    assert_eq!(media.ssrc[0].ssrc, 1944796561);
    assert_eq!(media.ssrc[0].cname.as_deref(), Some("/vC4ULAr8vHNjXmq"));
    assert_eq!(
        media.ssrc[0].label.as_deref(),
        Some("ec1eb8de-8df8-4956-ae81-879e5d062d12")
    );

    assert_eq!(media.rtp.header_extensions.len(), 1);
    assert_eq!(media.rtp.header_extensions[0].id, 1);
}

#[test]
fn test_firefox_audio_offer_session_level_defaults() {
    let d = SessionDescription::parse(FIREFOX_AUDIO_OFFER).unwrap();
    assert_eq!(d.media.len(), 1);

    let media = &d.media[0];
    assert_eq!(media.port, 45274);
    assert_eq!(media.ice_candidates.len(), 4);
    assert!(media.ice_candidates_complete);
    assert_eq!(media.ice.username_fragment.as_deref(), Some("403a81e1"));
    assert_eq!(
        media.ice.password.as_deref(),
        Some("f9b83487285016f7492197a5790ceee5")
    );
    // session-level attributes flow into the media section
    assert_eq!(media.ice_options.as_deref(), Some("trickle"));
    let dtls = media.dtls.as_ref().unwrap();
    assert_eq!(dtls.fingerprints.len(), 1);
    assert!(dtls.fingerprints[0].value.starts_with("EB:A9:3E:50"));

    // extmap direction suffix
    assert_eq!(media.rtp.header_extensions.len(), 2);
    assert_eq!(
        media.rtp.header_extensions[0].direction.as_deref(),
        Some("sendonly")
    );
    assert_eq!(media.rtp.header_extensions[1].direction, None);

    // explicit channel count and flag-style fmtp
    let g722 = media.codec(9).unwrap();
    assert_eq!(g722.channels, Some(1));
    let dtmf = media.codec(101).unwrap();
    assert_eq!(dtmf.parameters.len(), 1);
    assert_eq!(dtmf.parameters[0].key, "0-15");
    assert_eq!(dtmf.parameters[0].value, None);

    assert_eq!(
        d.webrtc_track_id(media).as_deref(),
        Some("{12692dea-686c-47ca-b3e9-48f38fc92b78}")
    );
}

#[test]
fn test_three_media_offer_round_trip() {
    let d = SessionDescription::parse(THREE_MEDIA_OFFER).unwrap();
    assert_eq!(d.media.len(), 3);
    assert_eq!(d.media[0].kind, "audio");
    assert_eq!(d.media[1].kind, "video");
    assert_eq!(d.media[2].kind, "application");
    assert_eq!(d.media[2].fmt, vec!["webrtc-datachannel"]);
    assert_eq!(d.media[2].sctp_port, Some(5000));
    assert_eq!(
        d.media[2].sctp_capabilities.map(|c| c.max_message_size),
        Some(65536)
    );
    assert_eq!(d.media[2].sctpmap, vec![(5000, "webrtc-datachannel 256".to_owned())]);

    // wildcard feedback lands on every codec of the section
    let vp8 = d.media[1].codec(97).unwrap();
    assert_eq!(vp8.rtcp_feedback.len(), 2);
    assert_eq!(vp8.rtcp_feedback[0].typ, "nack");
    assert_eq!(vp8.rtcp_feedback[0].parameter, None);
    assert_eq!(vp8.rtcp_feedback[1].parameter.as_deref(), Some("pli"));

    let rendered = d.to_string();
    let reparsed = SessionDescription::parse(&rendered).unwrap();
    assert_eq!(reparsed, d);

    // the canonical form is a fixed point
    assert_eq!(reparsed.to_string(), rendered);
}

#[test]
fn test_chrome_offer_round_trip() {
    let d = SessionDescription::parse(CHROME_AUDIO_OFFER).unwrap();
    let reparsed = SessionDescription::parse(&d.to_string()).unwrap();
    assert_eq!(reparsed, d);
}

#[test]
fn test_media_without_dtls() {
    let plain = "v=0\r
o=- 0 0 IN IP4 0.0.0.0\r
s=-\r
t=0 0\r
m=audio 12345 RTP/AVP 0\r
c=IN IP4 10.0.0.1\r
a=rtpmap:0 PCMU/8000\r
";
    let d = SessionDescription::parse(plain).unwrap();
    assert_eq!(d.media.len(), 1);
    assert!(d.media[0].dtls.is_none());
}

#[test]
fn test_forbidden_payload_type_rejected() {
    let bad = "v=0\r
o=- 0 0 IN IP4 0.0.0.0\r
s=-\r
t=0 0\r
m=audio 9 UDP/TLS/RTP/SAVPF 72\r
";
    assert!(SessionDescription::parse(bad).is_err());
}

#[test]
fn test_fmtp_for_unknown_payload_type_rejected() {
    let bad = "v=0\r
o=- 0 0 IN IP4 0.0.0.0\r
s=-\r
t=0 0\r
m=audio 9 UDP/TLS/RTP/SAVPF 0\r
a=rtpmap:0 PCMU/8000\r
a=fmtp:111 minptime=10\r
";
    assert!(SessionDescription::parse(bad).is_err());
}
