// Licensed under the Apache-2.0 license

use crate::accel::{HwError, ShaController};
use crate::context::{BackendKind, BackendPolicy, Sha256Context};
use crate::error::Sha256Error;
use crate::oneshot::{hash, hash_with};
use crate::selftest::self_test_with;
use crate::tests::{message, reference, Capture, MockPeripheral, NoopDelay, PoolAccelerator};

type MockController = ShaController<MockPeripheral, NoopDelay>;

fn controller(peripheral: MockPeripheral) -> MockController {
    ShaController::new(peripheral, NoopDelay::default())
}

fn faulty(at_block: usize) -> MockController {
    controller(MockPeripheral {
        fault_at_block: Some(at_block),
        ..MockPeripheral::default()
    })
}

#[test]
fn prefer_hardware_binds_accelerator() {
    let ctrl = controller(MockPeripheral::default());
    {
        let mut ctx = Sha256Context::with_accelerator(&ctrl);
        assert_eq!(ctx.policy(), BackendPolicy::PreferHardware);
        ctx.starts(false).unwrap();
        assert_eq!(ctx.backend(), BackendKind::Hardware);
        assert!(ctrl.is_busy());

        ctx.update(b"abc").unwrap();
        let mut out = [0u8; 32];
        ctx.finish(&mut out).unwrap();
        assert_eq!(out, reference(b"abc", false));
        assert_eq!(ctx.backend(), BackendKind::Finished);
        assert!(!ctrl.is_busy());
    }
    let (peripheral, _) = ctrl.into_inner();
    assert_eq!(peripheral.blocks, 1);
}

#[test]
fn second_context_falls_back_while_busy() {
    let ctrl = controller(MockPeripheral::default());
    let data = message(500);

    let mut first = Sha256Context::with_accelerator(&ctrl);
    let mut second = Sha256Context::with_accelerator(&ctrl);
    first.starts(false).unwrap();
    second.starts(true).unwrap();
    assert_eq!(first.backend(), BackendKind::Hardware);
    assert_eq!(second.backend(), BackendKind::Software);

    for piece in data.chunks(33) {
        first.update(piece).unwrap();
        second.update(piece).unwrap();
    }
    let (mut a, mut b) = ([0u8; 32], [0u8; 32]);
    first.finish(&mut a).unwrap();
    second.finish(&mut b).unwrap();
    assert_eq!(a, reference(&data, false));
    assert_eq!(b, reference(&data, true));

    let mut third = Sha256Context::with_accelerator(&ctrl);
    third.starts(false).unwrap();
    assert_eq!(third.backend(), BackendKind::Hardware);
}

#[test]
fn hardware_only_reports_unavailable_when_busy() {
    let ctrl = controller(MockPeripheral::default());
    let mut holder = Sha256Context::with_accelerator(&ctrl);
    holder.starts(false).unwrap();

    let mut ctx = Sha256Context::with_accelerator(&ctrl).with_policy(BackendPolicy::HardwareOnly);
    assert_eq!(ctx.starts(false), Err(Sha256Error::BackendUnavailable));
    assert_eq!(ctx.backend(), BackendKind::Idle);

    holder.free();
    ctx.starts(false).unwrap();
    assert_eq!(ctx.backend(), BackendKind::Hardware);
}

#[test]
fn software_only_never_touches_accelerator() {
    let ctrl = controller(MockPeripheral::default());
    {
        let mut ctx =
            Sha256Context::with_accelerator(&ctrl).with_policy(BackendPolicy::SoftwareOnly);
        ctx.starts(false).unwrap();
        assert_eq!(ctx.backend(), BackendKind::Software);
        assert!(!ctrl.is_busy());
        ctx.update(&message(200)).unwrap();
        let mut out = [0u8; 32];
        ctx.finish(&mut out).unwrap();
        assert_eq!(out, reference(&message(200), false));
    }
    let (peripheral, _) = ctrl.into_inner();
    assert_eq!(peripheral.enables, 0);
    assert_eq!(peripheral.blocks, 0);
}

#[test]
fn backends_agree_for_any_chunking() {
    let ctrl = controller(MockPeripheral::default());
    for len in [0, 3, 55, 56, 64, 65, 127, 128, 129, 640] {
        let data = message(len);
        for chunk in [1, 13, 64, 100] {
            for is224 in [false, true] {
                let mut hw = Sha256Context::with_accelerator(&ctrl);
                let mut sw =
                    Sha256Context::with_accelerator(&ctrl).with_policy(BackendPolicy::SoftwareOnly);
                hw.starts(is224).unwrap();
                sw.starts(is224).unwrap();
                assert_eq!(hw.backend(), BackendKind::Hardware);

                for piece in data.chunks(chunk) {
                    hw.update(piece).unwrap();
                    sw.update(piece).unwrap();
                }
                let (mut a, mut b) = ([0u8; 32], [0u8; 32]);
                hw.finish(&mut a).unwrap();
                sw.finish(&mut b).unwrap();
                assert_eq!(a, b, "len {len} chunk {chunk} is224 {is224}");
                assert_eq!(a, reference(&data, is224));
            }
        }
    }
}

#[test]
fn clone_of_single_engine_session_continues_in_software() {
    let ctrl = controller(MockPeripheral::default());
    let data = message(300);
    let (head, tail) = data.split_at(130);

    let mut ctx = Sha256Context::with_accelerator(&ctrl);
    ctx.starts(true).unwrap();
    ctx.update(head).unwrap();

    let mut copy = ctx.clone();
    assert_eq!(ctx.backend(), BackendKind::Hardware);
    assert_eq!(copy.backend(), BackendKind::Software);

    ctx.update(tail).unwrap();
    copy.update(tail).unwrap();
    let (mut a, mut b) = ([0u8; 32], [0u8; 32]);
    ctx.finish(&mut a).unwrap();
    copy.finish(&mut b).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, reference(&data, true));
}

#[test]
fn clone_on_forking_accelerator_stays_on_hardware() {
    let pool = PoolAccelerator::new(2);
    let data = message(90);
    let (head, tail) = data.split_at(70);

    let mut ctx = Sha256Context::with_accelerator(&pool);
    ctx.starts(false).unwrap();
    ctx.update(head).unwrap();
    let mut copy = ctx.clone();
    assert_eq!(copy.backend(), BackendKind::Hardware);
    assert_eq!(pool.open_sessions(), 2);

    // Pool is full now, a further clone migrates.
    let mut third = copy.clone();
    assert_eq!(third.backend(), BackendKind::Software);

    for c in [&mut ctx, &mut copy, &mut third] {
        c.update(tail).unwrap();
        let mut out = [0u8; 32];
        c.finish(&mut out).unwrap();
        assert_eq!(out, reference(&data, false));
    }
    assert_eq!(pool.open_sessions(), 0);
}

#[test]
fn clone_from_inconsistent_export_is_finished() {
    let pool = PoolAccelerator::new(1).with_corrupt_export();
    let mut ctx = Sha256Context::with_accelerator(&pool);
    ctx.starts(false).unwrap();
    ctx.update(b"ab").unwrap();

    let mut copy = ctx.clone();
    assert_eq!(copy.backend(), BackendKind::Finished);
    assert_eq!(copy.update(b"c"), Err(Sha256Error::InvalidSequence));

    ctx.update(b"c").unwrap();
    let mut out = [0u8; 32];
    ctx.finish(&mut out).unwrap();
    assert_eq!(out, reference(b"abc", false));
}

#[test]
fn fault_during_update_ends_session() {
    let ctrl = faulty(0);
    let mut ctx = Sha256Context::with_accelerator(&ctrl);
    ctx.starts(false).unwrap();

    assert_eq!(
        ctx.update(&[0u8; 64]),
        Err(Sha256Error::HardwareFault(HwError::Fault))
    );
    assert_eq!(ctx.backend(), BackendKind::Finished);
    assert!(!ctrl.is_busy());

    assert_eq!(ctx.update(b"x"), Err(Sha256Error::InvalidSequence));
    let mut out = [0x33u8; 32];
    assert_eq!(ctx.finish(&mut out), Err(Sha256Error::InvalidSequence));
    assert_eq!(out, [0x33; 32]);

    ctx.starts(false).unwrap();
    assert_eq!(ctx.backend(), BackendKind::Hardware);
    ctx.update(b"abc").unwrap();
    ctx.finish(&mut out).unwrap();
    assert_eq!(out, reference(b"abc", false));
}

#[test]
fn fault_during_finish_leaves_output_untouched() {
    let ctrl = faulty(0);
    let mut ctx = Sha256Context::with_accelerator(&ctrl);
    ctx.starts(true).unwrap();
    ctx.update(b"short").unwrap();

    let mut out = [0x44u8; 32];
    assert_eq!(
        ctx.finish(&mut out),
        Err(Sha256Error::HardwareFault(HwError::Fault))
    );
    assert_eq!(out, [0x44; 32]);
    assert_eq!(ctx.backend(), BackendKind::Finished);
    assert!(!ctrl.is_busy());
}

#[test]
fn timeout_surfaces_as_hardware_fault() {
    let ctrl = controller(MockPeripheral {
        hang: true,
        ..MockPeripheral::default()
    });
    let mut ctx = Sha256Context::with_accelerator(&ctrl);
    ctx.starts(false).unwrap();
    assert_eq!(
        ctx.update(&[0u8; 64]),
        Err(Sha256Error::HardwareFault(HwError::Timeout))
    );
    assert!(!ctrl.is_busy());
    drop(ctx);

    let (_, delay) = ctrl.into_inner();
    assert!(delay.waited_ns >= 10_000_000);
}

#[test]
fn free_and_drop_release_accelerator() {
    let ctrl = controller(MockPeripheral::default());

    let mut ctx = Sha256Context::with_accelerator(&ctrl);
    ctx.starts(false).unwrap();
    ctx.update(b"partial").unwrap();
    ctx.free();
    assert_eq!(ctx.backend(), BackendKind::Idle);
    assert!(!ctrl.is_busy());

    ctx.starts(false).unwrap();
    assert!(ctrl.is_busy());
    drop(ctx);
    assert!(!ctrl.is_busy());
}

#[test]
fn restart_reacquires_accelerator() {
    let ctrl = controller(MockPeripheral::default());
    let mut ctx = Sha256Context::with_accelerator(&ctrl);
    ctx.starts(true).unwrap();
    ctx.update(b"discarded").unwrap();

    ctx.starts(false).unwrap();
    assert_eq!(ctx.backend(), BackendKind::Hardware);
    ctx.update(b"abc").unwrap();
    let mut out = [0u8; 32];
    ctx.finish(&mut out).unwrap();
    assert_eq!(out, reference(b"abc", false));
}

#[test]
fn process_block_rejected_on_hardware_session() {
    let ctrl = controller(MockPeripheral::default());
    let mut ctx = Sha256Context::with_accelerator(&ctrl);
    ctx.starts(false).unwrap();
    assert_eq!(
        ctx.process_block(&[0u8; 64]),
        Err(Sha256Error::InvalidSequence)
    );
    assert_eq!(ctx.backend(), BackendKind::Hardware);
}

#[test]
fn contexts_on_many_threads_share_one_engine() {
    let ctrl = controller(MockPeripheral {
        busy_polls: 1,
        ..MockPeripheral::default()
    });

    std::thread::scope(|scope| {
        for worker in 0..4usize {
            let ctrl = &ctrl;
            scope.spawn(move || {
                for round in 0..25usize {
                    let data = message(worker * 97 + round * 13);
                    let is224 = round % 2 == 1;
                    assert_eq!(
                        hash_with(ctrl, &data, is224).unwrap(),
                        reference(&data, is224)
                    );
                }
            });
        }
    });

    assert!(!ctrl.is_busy());
}

#[test]
fn hash_with_accelerator_matches_software() {
    let ctrl = controller(MockPeripheral::default());
    let data = message(777);
    assert_eq!(hash_with(&ctrl, &data, false).unwrap(), hash(&data, false));
    assert_eq!(hash_with(&ctrl, &data, true).unwrap(), hash(&data, true));
}

#[test]
fn self_test_passes_on_accelerator() {
    let ctrl = controller(MockPeripheral::default());
    let mut out = Capture::default();
    assert!(self_test_with(&ctrl, true, &mut out));
    let text = String::from_utf8(out.0).unwrap();
    assert!(!text.contains("failed"));

    let (peripheral, _) = ctrl.into_inner();
    assert!(peripheral.blocks > 15_625);
}

#[test]
fn self_test_passes_on_forking_accelerator() {
    let pool = PoolAccelerator::new(2);
    assert!(self_test_with(&pool, false, &mut Capture::default()));
    assert_eq!(pool.open_sessions(), 0);
}
