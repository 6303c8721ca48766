use platform_repo::{
    ArchCommonObjectType, ArmObjectType, CM_REF, CROSS_REF_SIZE, DynamicPlatformRepository,
    Namespace, ObjectDescriptor, ObjectId, RepoError, RepoState, RiscVObjectType, Token,
    encode_references,
};

fn token_field(bytes: &[u8]) -> Token {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    Token::new(u64::from_le_bytes(raw))
}

#[test]
fn add_is_rejected_after_finalize() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = ArmObjectType::GicDInfo.id();
    repo.add_object(&ObjectDescriptor::single(id, &[1, 2, 3, 4]))
        .unwrap();
    repo.finalize().unwrap();

    assert_eq!(
        repo.add_object(&ObjectDescriptor::single(id, &[5, 6, 7, 8])),
        Err(RepoError::InvalidParameter)
    );
    assert_eq!(repo.object_count(), 1);
    assert_eq!(repo.get_object(id, None).unwrap().count, 1);
}

#[test]
fn get_is_rejected_before_finalize() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = ArmObjectType::GicDInfo.id();
    let token = repo
        .add_object(&ObjectDescriptor::single(id, &[1, 2, 3, 4]))
        .unwrap();

    assert_eq!(repo.get_object(id, None), Err(RepoError::InvalidParameter));
    assert_eq!(
        repo.get_object(id, Some(token)),
        Err(RepoError::InvalidParameter)
    );
    assert_eq!(repo.state(), RepoState::Transient);

    // Still open for writes afterwards.
    repo.add_object(&ObjectDescriptor::single(id, &[5, 6, 7, 8]))
        .unwrap();
    assert_eq!(repo.object_count(), 2);
}

#[test]
fn finalize_is_one_shot() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    repo.finalize().unwrap();
    assert_eq!(repo.finalize(), Err(RepoError::InvalidParameter));
    assert_eq!(repo.state(), RepoState::Finalized);
}

#[test]
fn query_by_type_concatenates_in_insertion_order() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = ArmObjectType::GicCInfo.id();
    let objects: [&[u8]; 3] = [&[0x10, 0x11, 0x12, 0x13], &[0x20, 0x21, 0x22, 0x23], &[
        0x30, 0x31, 0x32, 0x33,
    ]];
    for bytes in objects {
        repo.add_object(&ObjectDescriptor::single(id, bytes)).unwrap();
    }
    repo.finalize().unwrap();

    let all = repo.get_object(id, None).unwrap();
    assert_eq!(all.id, id);
    assert_eq!(all.count, 3);
    assert_eq!(all.size, 12);
    assert_eq!(all.data, objects.concat().as_slice());
    assert_eq!(all.elements().count(), 3);
}

#[test]
fn query_by_token_returns_exactly_that_object() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let gicc = ArmObjectType::GicCInfo.id();
    let rintc = RiscVObjectType::RintcInfo.id();
    let serial = ArchCommonObjectType::SerialPortInfo.id();

    let t1 = repo.add_object(&ObjectDescriptor::single(gicc, &[1; 6])).unwrap();
    let t2 = repo.add_object(&ObjectDescriptor::single(gicc, &[2; 6])).unwrap();
    let t3 = repo.add_object(&ObjectDescriptor::single(rintc, &[3; 10])).unwrap();
    let t4 = repo.add_object(&ObjectDescriptor::single(serial, &[4; 2])).unwrap();
    repo.finalize().unwrap();

    for (id, token, expected) in [
        (gicc, t1, [1u8; 6].as_slice()),
        (gicc, t2, [2u8; 6].as_slice()),
        (rintc, t3, [3u8; 10].as_slice()),
        (serial, t4, [4u8; 2].as_slice()),
    ] {
        let d = repo.get_object(id, Some(token)).unwrap();
        assert_eq!(d.data, expected);
        assert_eq!(d.size, expected.len());
        assert_eq!(d.count, 1);
    }
}

#[test]
fn token_of_another_kind_is_not_found() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let gicc = ArmObjectType::GicCInfo.id();
    let gicd = ArmObjectType::GicDInfo.id();
    let token = repo.add_object(&ObjectDescriptor::single(gicc, &[1; 4])).unwrap();
    repo.add_object(&ObjectDescriptor::single(gicd, &[2; 4])).unwrap();
    repo.finalize().unwrap();

    assert_eq!(repo.get_object(gicd, Some(token)), Err(RepoError::NotFound));
    assert_eq!(
        repo.get_object(gicc, Some(Token::new(0xDEAD))),
        Err(RepoError::NotFound)
    );
}

#[test]
fn null_token_means_whole_group() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = RiscVObjectType::AplicInfo.id();
    repo.add_object(&ObjectDescriptor::single(id, &[1; 4])).unwrap();
    repo.add_object(&ObjectDescriptor::single(id, &[2; 4])).unwrap();
    repo.finalize().unwrap();

    assert_eq!(repo.get_object(id, Some(Token::NULL)).unwrap().count, 2);
}

#[test]
fn kind_never_added_is_not_found() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    repo.finalize().unwrap();
    assert_eq!(
        repo.get_object(ArmObjectType::SmmuV3.id(), None),
        Err(RepoError::NotFound)
    );
    assert_eq!(
        repo.get_object(ArmObjectType::SmmuV3.id(), Some(Token::new(1))),
        Err(RepoError::NotFound)
    );
}

#[test]
fn cross_reference_counts_use_different_units() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let refs = encode_references(&[Token::new(100), Token::new(101), Token::new(102)]);
    let token = repo
        .add_object(&ObjectDescriptor::references_of(&refs))
        .unwrap();
    let single = encode_references(&[Token::new(200)]);
    repo.add_object(&ObjectDescriptor::references_of(&single))
        .unwrap();
    repo.finalize().unwrap();

    let one = repo.get_object(CM_REF, Some(token)).unwrap();
    assert_eq!(one.count, 3);
    assert_eq!(one.size, 3 * CROSS_REF_SIZE);
    assert!(one.references().map(Token::as_u64).eq([100, 101, 102]));

    // the grouped array counts groups, not records; it is not queryable
    assert_eq!(
        repo.get_object(CM_REF, None),
        Err(RepoError::InvalidParameter)
    );
}

#[test]
fn cross_reference_size_must_match_count() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let refs = encode_references(&[Token::new(1), Token::new(2)]);
    assert_eq!(
        repo.add_object(&ObjectDescriptor::array(CM_REF, 3, &refs)),
        Err(RepoError::InvalidParameter)
    );
}

#[test]
fn type_ids_at_or_above_namespace_max_are_rejected() {
    for (namespace, max) in [
        (Namespace::Arm, ArmObjectType::COUNT),
        (Namespace::RiscV, RiscVObjectType::COUNT),
        (Namespace::ArchCommon, ArchCommonObjectType::COUNT),
    ] {
        let mut repo = DynamicPlatformRepository::new().unwrap();
        for raw in [max, max + 1, u8::MAX] {
            let id = ObjectId::from_parts(namespace, raw);
            assert_eq!(
                repo.add_object(&ObjectDescriptor::single(id, &[0; 8])),
                Err(RepoError::InvalidParameter),
                "{namespace:?} type {raw}"
            );
        }

        let last = ObjectId::from_parts(namespace, max - 1);
        repo.add_object(&ObjectDescriptor::single(last, &[0; 8])).unwrap();
        repo.finalize().unwrap();

        let id = ObjectId::from_parts(namespace, max);
        assert_eq!(repo.get_object(id, None), Err(RepoError::InvalidParameter));
        assert_eq!(
            repo.get_object(id, Some(Token::new(1))),
            Err(RepoError::InvalidParameter)
        );
        assert_eq!(repo.object_count(), 1);
    }
}

#[test]
fn unknown_namespaces_are_rejected() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    for raw in [0x0000_0001, 0x3000_0001, 0x8000_0001] {
        let id = ObjectId::from_bits(raw);
        assert_eq!(
            repo.add_object(&ObjectDescriptor::single(id, &[0; 4])),
            Err(RepoError::InvalidParameter)
        );
    }
}

#[test]
fn malformed_descriptors_are_rejected() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = ArmObjectType::GicCInfo.id();
    let bytes = [0u8; 8];

    let empty = ObjectDescriptor::single(id, &[]);
    assert_eq!(repo.add_object(&empty), Err(RepoError::InvalidParameter));

    let zero_count = ObjectDescriptor::array(id, 0, &bytes);
    assert_eq!(repo.add_object(&zero_count), Err(RepoError::InvalidParameter));

    let size_mismatch = ObjectDescriptor {
        id,
        size: 16,
        count: 1,
        data: &bytes,
    };
    assert_eq!(
        repo.add_object(&size_mismatch),
        Err(RepoError::InvalidParameter)
    );
    assert_eq!(repo.object_count(), 0);
}

#[test]
fn only_cross_references_may_be_arrays_in_arch_common() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = ArchCommonObjectType::CacheInfo.id();
    assert_eq!(
        repo.add_object(&ObjectDescriptor::array(id, 2, &[0; 16])),
        Err(RepoError::InvalidParameter)
    );
}

#[test]
fn self_referencing_arm_node_carries_its_token() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = ArmObjectType::ItsGroup.id();
    let producer_bytes = [0u8; 24];
    let token = repo
        .add_object(&ObjectDescriptor::single(id, &producer_bytes))
        .unwrap();
    repo.finalize().unwrap();

    let node = repo.get_object(id, Some(token)).unwrap();
    assert_eq!(token_field(node.data), token);
    assert!(node.data[8..].iter().all(|&b| b == 0));
    // The producer's buffer is never written.
    assert!(producer_bytes.iter().all(|&b| b == 0));
}

#[test]
fn other_namespaces_are_not_fixed_up() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let riscv = RiscVObjectType::RintcInfo.id();
    let common = ArchCommonObjectType::ProcHierarchyInfo.id();
    let t1 = repo
        .add_object(&ObjectDescriptor::single(riscv, &[0xEE; 16]))
        .unwrap();
    let t2 = repo
        .add_object(&ObjectDescriptor::single(common, &[0xEE; 16]))
        .unwrap();
    repo.finalize().unwrap();

    for (id, token) in [(riscv, t1), (common, t2)] {
        let d = repo.get_object(id, Some(token)).unwrap();
        assert!(d.data.iter().all(|&b| b == 0xEE));
    }
}

#[test]
fn unsupported_self_reference_stores_nothing() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let id = ArmObjectType::Pmcg.id();
    assert_eq!(
        repo.add_object(&ObjectDescriptor::single(id, &[0; 16])),
        Err(RepoError::Unsupported)
    );
    assert_eq!(repo.object_count(), 0);
    repo.finalize().unwrap();
    assert_eq!(repo.get_object(id, None), Err(RepoError::NotFound));
}

#[test]
fn tokens_are_unique_across_kinds() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let mut tokens = Vec::new();
    for kind in [ArmObjectType::GicCInfo, ArmObjectType::GicDInfo] {
        for _ in 0..3 {
            tokens.push(
                repo.add_object(&ObjectDescriptor::single(kind.id(), &[0; 4]))
                    .unwrap(),
            );
        }
    }
    let mut sorted = tokens.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), tokens.len());
}

/// A multi-element Arm object is accepted while the repository is open but
/// fails grouping. Finalize aborts at that type: kinds grouped earlier stay
/// grouped (no rollback), later kinds are never grouped, and token lookups
/// are unavailable because the mapper has been shut down.
#[test]
fn grouping_failure_aborts_finalize_without_rollback() {
    let mut repo = DynamicPlatformRepository::new().unwrap();
    let early = ArmObjectType::GicCInfo.id();
    let bad = ArmObjectType::GicItsInfo.id();
    let late = RiscVObjectType::RintcInfo.id();

    let early_token = repo
        .add_object(&ObjectDescriptor::single(early, &[1; 4]))
        .unwrap();
    repo.add_object(&ObjectDescriptor::array(bad, 2, &[2; 8]))
        .unwrap();
    repo.add_object(&ObjectDescriptor::single(late, &[3; 4]))
        .unwrap();

    assert_eq!(repo.finalize(), Err(RepoError::InvalidParameter));
    assert_eq!(repo.state(), RepoState::Finalized);

    assert_eq!(repo.get_object(early, None).unwrap().data, &[1; 4]);
    assert_eq!(repo.get_object(bad, None), Err(RepoError::NotFound));
    assert_eq!(repo.get_object(late, None), Err(RepoError::NotFound));
    assert_eq!(
        repo.get_object(early, Some(early_token)),
        Err(RepoError::InvalidParameter)
    );

    repo.shutdown().unwrap();
}

#[test]
fn shutdown_is_legal_in_both_phases() {
    let mut open = DynamicPlatformRepository::new().unwrap();
    open.add_object(&ObjectDescriptor::single(ArmObjectType::GicCInfo.id(), &[0; 4]))
        .unwrap();
    assert_eq!(open.shutdown(), Ok(()));

    let mut frozen = DynamicPlatformRepository::new().unwrap();
    frozen.finalize().unwrap();
    assert_eq!(frozen.shutdown(), Ok(()));
}
