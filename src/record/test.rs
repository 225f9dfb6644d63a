use super::{parse_line, parse_memcpy_line, Action, MemcpyRecord, Record};

fn sample() -> Record {
    Record {
        action: Action::Malloc,
        seq: 1,
        size: 200,
        python_fraction: 1.0,
        pid: 42,
        pointer: 0x1000,
        file: "/proj/a.py".to_string(),
        line: 17,
        bytei: 3,
    }
}

#[test]
fn s3_malloc_record_matches_expected_line() {
    let r = sample();
    assert_eq!(r.format(), "M,1,200,1.000000,42,0x1000,/proj/a.py,17,3\n");
}

#[test]
fn s3_free_of_last_trigger_matches_expected_line() {
    let r = Record {
        action: Action::FreeOfLastTrigger,
        seq: 2,
        ..sample()
    };
    assert_eq!(r.format(), "f,2,200,1.000000,42,0x1000,/proj/a.py,17,3\n");
}

#[test]
fn round_trips_through_parse_line() {
    let r = sample();
    let parsed = parse_line(&r.format()).unwrap();
    assert_eq!(parsed, r);
}

#[test]
fn parse_line_tolerates_single_and_double_newline() {
    let single = "M,1,200,1.000000,42,0x1000,/proj/a.py,17,3\n";
    let double = "M,1,200,1.000000,42,0x1000,/proj/a.py,17,3\n\n";
    assert_eq!(parse_line(single).unwrap(), parse_line(double.trim_end_matches('\n')).unwrap());
}

#[test]
fn schema_regex_shape_holds() {
    // The line's regular form:
    // [MFf],\d+,\d+,-?\d+\.\d+,\d+,0x[0-9a-fA-F]+,[^,]*,\d+,\d+
    let line = sample().format();
    let mut parts = line.trim_end().splitn(9, ',');
    assert!(matches!(parts.next(), Some("M")));
    assert!(parts.next().unwrap().chars().all(|c| c.is_ascii_digit()));
    assert!(parts.next().unwrap().chars().all(|c| c.is_ascii_digit()));
    let frac = parts.next().unwrap();
    assert!(frac.contains('.'));
    assert!(parts.next().unwrap().chars().all(|c| c.is_ascii_digit()));
    assert!(parts.next().unwrap().starts_with("0x"));
}

#[test]
fn malformed_line_parses_to_none() {
    assert!(parse_line("garbage").is_none());
    assert!(parse_line("X,1,2,3,4,0x1,f,1,2\n").is_none());
}

#[test]
fn memcpy_record_formats_and_round_trips() {
    let r = MemcpyRecord {
        seq: 5,
        bytes: 4096,
        pid: 42,
        file: "/proj/a.py".to_string(),
        line: 9,
        bytei: 1,
    };
    assert_eq!(r.format(), "5,4096,42,/proj/a.py,9,1\n");
    assert_eq!(parse_memcpy_line(&r.format()).unwrap(), r);
}
