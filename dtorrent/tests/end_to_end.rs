mod support;

use std::sync::Arc;

use dtorrent::coordinator::Coordinator;
use dtorrent::peer::BtPeer;
use dtorrent::storage::FileSet;

const TIMEOUT_SECS: u64 = 5;

/// Scenario 1: single-file, single seeder. Four pieces, fresh leecher with
/// an empty data folder. Every piece should land, final bytes should match
/// the seeder's, and the persisted bitfield should end up fully set.
#[test]
fn single_file_single_seeder_downloads_every_piece() {
    let content: Vec<u8> = (0u8..=255).cycle().take(1024).collect();
    let metadata = support::build_metadata("movie.bin", 256, vec![("movie.bin", content.clone())]);
    let metadata = Arc::new(metadata);
    let piece_count = metadata.piece_count() as usize;

    let seeder_dir = support::temp_dir("scenario1-seeder");
    let seeder_files = support::seed_file_set(&metadata, &seeder_dir, &[content.clone()]);
    let seeder_logger = support::test_logger("scenario1-seeder");
    let port = support::spawn_seeder(
        metadata.info_hash,
        [1u8; 20],
        seeder_files,
        metadata.piece_length,
        piece_count,
        seeder_logger,
    );

    let leecher_dir = support::temp_dir("scenario1-leecher");
    let leecher_files = Arc::new(FileSet::open(&metadata, leecher_dir.to_str().unwrap()).unwrap());
    leecher_files.initialize_for_download().unwrap();

    let (log, _json_path, _torrent_dir, log_dir) = support::new_log("scenario1");
    let info_hash_hex = metadata.info_hash_hex();
    log.add_torrent(
        &info_hash_hex,
        metadata.piece_length,
        metadata.piece_count(),
        "unused.torrent",
        leecher_dir.to_str().unwrap(),
        None,
    )
    .unwrap();
    let log = Arc::new(log);

    let coordinator = Coordinator::new(
        metadata.clone(),
        leecher_files.clone(),
        log.clone(),
        [2u8; 20],
        TIMEOUT_SECS,
        support::test_logger("scenario1-leecher"),
    );

    coordinator
        .download(vec![BtPeer::new("127.0.0.1".to_string(), port)])
        .unwrap();

    for piece_index in 0..metadata.piece_count() {
        let start = piece_index as usize * 256;
        let end = (start + 256).min(content.len());
        let expected = &content[start..end];
        let actual = leecher_files
            .read_block(piece_index, 0, expected.len() as u32)
            .unwrap();
        assert_eq!(actual, expected, "piece {} mismatch", piece_index);
    }

    let bitfield = log.get_bitfield(&info_hash_hex).unwrap();
    assert!(bitfield.iter().all(|&b| b == 1));

    std::fs::remove_dir_all(&seeder_dir).ok();
    std::fs::remove_dir_all(&leecher_dir).ok();
    std::fs::remove_dir_all(&log_dir).ok();
}

/// Scenario 2: a two-file torrent whose pieces don't align with file
/// boundaries. Downloading must scatter-write across both backing files and
/// reassemble byte-identical copies.
#[test]
fn block_boundary_spanning_two_files_downloads_correctly() {
    let file_a = vec![1u8; 10];
    let file_b = vec![2u8; 10];
    let metadata = support::build_metadata(
        "two-files",
        16,
        vec![("a.bin", file_a.clone()), ("b.bin", file_b.clone())],
    );
    let metadata = Arc::new(metadata);
    let piece_count = metadata.piece_count() as usize;
    assert_eq!(piece_count, 2);

    let seeder_dir = support::temp_dir("scenario2-seeder");
    let seeder_files = support::seed_file_set(&metadata, &seeder_dir, &[file_a.clone(), file_b.clone()]);
    let port = support::spawn_seeder(
        metadata.info_hash,
        [1u8; 20],
        seeder_files,
        metadata.piece_length,
        piece_count,
        support::test_logger("scenario2-seeder"),
    );

    let leecher_dir = support::temp_dir("scenario2-leecher");
    let leecher_files = Arc::new(FileSet::open(&metadata, leecher_dir.to_str().unwrap()).unwrap());
    leecher_files.initialize_for_download().unwrap();

    let (log, _json_path, _torrent_dir, log_dir) = support::new_log("scenario2");
    let info_hash_hex = metadata.info_hash_hex();
    log.add_torrent(
        &info_hash_hex,
        metadata.piece_length,
        metadata.piece_count(),
        "unused.torrent",
        leecher_dir.to_str().unwrap(),
        None,
    )
    .unwrap();
    let log = Arc::new(log);

    let coordinator = Coordinator::new(
        metadata.clone(),
        leecher_files.clone(),
        log,
        [2u8; 20],
        TIMEOUT_SECS,
        support::test_logger("scenario2-leecher"),
    );
    coordinator
        .download(vec![BtPeer::new("127.0.0.1".to_string(), port)])
        .unwrap();

    // Piece 0 scatters across a.bin (all 10 bytes) and the first 6 bytes of
    // b.bin; piece 1 carries b.bin's last 4 bytes.
    let whole = leecher_files.read_block(0, 0, 16).unwrap();
    assert_eq!(&whole[..10], file_a.as_slice());
    assert_eq!(&whole[10..16], &file_b[..6]);
    let rest = leecher_files.read_block(1, 0, 4).unwrap();
    assert_eq!(rest, &file_b[6..]);

    std::fs::remove_dir_all(&seeder_dir).ok();
    std::fs::remove_dir_all(&leecher_dir).ok();
    std::fs::remove_dir_all(&log_dir).ok();
}

/// Scenario 3: two peers advertise the same piece; one serves a corrupt
/// copy, the other the real bytes. The coordinator must recover and finish
/// with the correct bytes despite the corrupt peer winning the race
/// sometimes.
#[test]
fn corrupt_piece_from_one_peer_recovers_from_another() {
    let content = vec![7u8; 16];
    let metadata = support::build_metadata("single-piece", 16, vec![("f.bin", content.clone())]);
    let metadata = Arc::new(metadata);
    let piece_count = metadata.piece_count() as usize;
    assert_eq!(piece_count, 1);

    let good_dir = support::temp_dir("scenario3-good");
    let good_files = support::seed_file_set(&metadata, &good_dir, &[content.clone()]);
    let good_port = support::spawn_seeder(
        metadata.info_hash,
        [1u8; 20],
        good_files,
        metadata.piece_length,
        piece_count,
        support::test_logger("scenario3-good"),
    );

    let bad_dir = support::temp_dir("scenario3-bad");
    let bad_content = vec![9u8; 16];
    let bad_files = support::seed_file_set(&metadata, &bad_dir, &[bad_content]);
    let bad_port = support::spawn_seeder(
        metadata.info_hash,
        [3u8; 20],
        bad_files,
        metadata.piece_length,
        piece_count,
        support::test_logger("scenario3-bad"),
    );

    let leecher_dir = support::temp_dir("scenario3-leecher");
    let leecher_files = Arc::new(FileSet::open(&metadata, leecher_dir.to_str().unwrap()).unwrap());
    leecher_files.initialize_for_download().unwrap();

    let (log, _json_path, _torrent_dir, log_dir) = support::new_log("scenario3");
    let info_hash_hex = metadata.info_hash_hex();
    log.add_torrent(
        &info_hash_hex,
        metadata.piece_length,
        metadata.piece_count(),
        "unused.torrent",
        leecher_dir.to_str().unwrap(),
        None,
    )
    .unwrap();
    let log = Arc::new(log);

    let coordinator = Coordinator::new(
        metadata.clone(),
        leecher_files.clone(),
        log.clone(),
        [2u8; 20],
        TIMEOUT_SECS,
        support::test_logger("scenario3-leecher"),
    );
    coordinator
        .download(vec![
            BtPeer::new("127.0.0.1".to_string(), bad_port),
            BtPeer::new("127.0.0.1".to_string(), good_port),
        ])
        .unwrap();

    let actual = leecher_files.read_block(0, 0, 16).unwrap();
    assert_eq!(actual, content);
    assert_eq!(log.get_bitfield(&info_hash_hex).unwrap(), vec![1]);

    std::fs::remove_dir_all(&good_dir).ok();
    std::fs::remove_dir_all(&bad_dir).ok();
    std::fs::remove_dir_all(&leecher_dir).ok();
    std::fs::remove_dir_all(&log_dir).ok();
}

/// Scenario 6: a leecher that already has pieces 0 and 2 (bitfield
/// `[1,0,1,0]`) persisted before this run starts should only fetch pieces 1
/// and 3, and its already-downloaded pieces must be left untouched.
#[test]
fn restart_resumes_from_partial_bitfield() {
    let piece = |byte: u8| vec![byte; 4];
    let content: Vec<u8> = [piece(1), piece(2), piece(3), piece(4)].concat();
    let metadata = support::build_metadata("resume.bin", 4, vec![("resume.bin", content.clone())]);
    let metadata = Arc::new(metadata);
    let piece_count = metadata.piece_count() as usize;
    assert_eq!(piece_count, 4);

    let seeder_dir = support::temp_dir("scenario6-seeder");
    let seeder_files = support::seed_file_set(&metadata, &seeder_dir, &[content.clone()]);
    let port = support::spawn_seeder(
        metadata.info_hash,
        [1u8; 20],
        seeder_files,
        metadata.piece_length,
        piece_count,
        support::test_logger("scenario6-seeder"),
    );

    let leecher_dir = support::temp_dir("scenario6-leecher");
    let leecher_files = Arc::new(FileSet::open(&metadata, leecher_dir.to_str().unwrap()).unwrap());
    leecher_files.initialize_for_download().unwrap();
    // Pre-populate pieces 0 and 2, as if a prior run had already saved them.
    leecher_files.write_block(0, 0, &piece(1)).unwrap();
    leecher_files.write_block(2, 0, &piece(3)).unwrap();

    let (json_path, torrent_dir, log_dir) = {
        let (log, json_path, torrent_dir, log_dir) = support::new_log("scenario6");
        let info_hash_hex = metadata.info_hash_hex();
        log.add_torrent(
            &info_hash_hex,
            metadata.piece_length,
            metadata.piece_count(),
            "unused.torrent",
            leecher_dir.to_str().unwrap(),
            Some(vec![1, 0, 1, 0]),
        )
        .unwrap();
        (json_path, torrent_dir, log_dir)
    };

    // Simulate the process restarting: reopen the log from what's on disk.
    let log = Arc::new(dtorrent::log::TorrentLog::new(&json_path, &torrent_dir).unwrap());
    let info_hash_hex = metadata.info_hash_hex();
    assert_eq!(log.get_bitfield(&info_hash_hex).unwrap(), vec![1, 0, 1, 0]);

    let coordinator = Coordinator::new(
        metadata.clone(),
        leecher_files.clone(),
        log.clone(),
        [2u8; 20],
        TIMEOUT_SECS,
        support::test_logger("scenario6-leecher"),
    );
    coordinator
        .download(vec![BtPeer::new("127.0.0.1".to_string(), port)])
        .unwrap();

    for (index, expected_byte) in [1u8, 2, 3, 4].into_iter().enumerate() {
        let actual = leecher_files.read_block(index as u32, 0, 4).unwrap();
        assert_eq!(actual, piece(expected_byte), "piece {} mismatch", index);
    }
    assert!(log.get_bitfield(&info_hash_hex).unwrap().iter().all(|&b| b == 1));

    std::fs::remove_dir_all(&seeder_dir).ok();
    std::fs::remove_dir_all(&leecher_dir).ok();
    std::fs::remove_dir_all(&log_dir).ok();
}
