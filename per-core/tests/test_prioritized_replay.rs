use anyhow::Result;
use per_core::{
    replay_buffer::{PerConfig, ReplayBuffer, ReplayBufferConfig},
    ExperienceBufferBase, PerError, ReplayBufferBase, Transition,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const OBS_DIM: usize = 4;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn transition(i: usize) -> Transition {
    let obs = vec![i as f32; OBS_DIM];
    let next_obs = vec![i as f32 + 1.0; OBS_DIM];
    Transition::new(obs, (i % 3) as i64, 1.0, next_obs)
}

fn per_config() -> ReplayBufferConfig {
    ReplayBufferConfig::default()
        .capacity(4)
        .seed(1)
        .per_config(Some(PerConfig::default()))
}

#[test]
fn test_store_evict_update() -> Result<()> {
    init();
    let mut buffer = ReplayBuffer::<Transition>::build(&per_config())?;
    let ixs = (0..4)
        .map(|i| buffer.store(transition(i)))
        .collect::<Result<Vec<_>, _>>()?;
    let buffer_per = match &buffer {
        ReplayBuffer::Prioritized(b) => b,
        ReplayBuffer::Uniform(_) => panic!("expected a prioritized buffer"),
    };
    assert_eq!(buffer_per.total_priority(), 4.0);

    buffer.push(transition(4))?;
    assert_eq!(buffer.len(), 4);
    let buffer_per = match &buffer {
        ReplayBuffer::Prioritized(b) => b,
        ReplayBuffer::Uniform(_) => unreachable!(),
    };
    assert_eq!(buffer_per.total_priority(), 4.0);
    let mut stored = buffer_per.sum_tree().records().cloned().collect::<Vec<_>>();
    stored.sort_by(|a, b| a.obs[0].total_cmp(&b.obs[0]));
    assert_eq!(stored, (1..5).map(transition).collect::<Vec<_>>());

    buffer.update_priority(&ixs[1..2], &[0.0])?;
    let buffer_per = match &buffer {
        ReplayBuffer::Prioritized(b) => b,
        ReplayBuffer::Uniform(_) => unreachable!(),
    };
    let expected = 3.0 + 0.01f32.powf(0.6);
    assert!((buffer_per.total_priority() - expected).abs() < 1e-5);
    assert!((buffer_per.total_priority() - 3.0631).abs() < 1e-4);
    Ok(())
}

#[test]
fn test_sample_before_store() -> Result<()> {
    init();
    let mut buffer = ReplayBuffer::<Transition>::build(&per_config())?;
    let err = buffer.batch(1).unwrap_err();
    assert_eq!(err.downcast_ref::<PerError>(), Some(&PerError::ZeroTotalPriority));
    Ok(())
}

#[test]
fn test_zero_capacity() {
    init();
    let config = per_config().capacity(0);
    let err = ReplayBuffer::<Transition>::build(&config).unwrap_err();
    assert_eq!(err.downcast_ref::<PerError>(), Some(&PerError::InvalidCapacity(0)));

    let config = config.per_config(None);
    assert!(ReplayBuffer::<Transition>::build(&config).is_err());
}

#[test]
fn test_variant_selection() -> Result<()> {
    init();
    let buffer = ReplayBuffer::<Transition>::build(&per_config())?;
    assert!(buffer.is_prioritized());
    let buffer = ReplayBuffer::<Transition>::build(&per_config().per_config(None))?;
    assert!(!buffer.is_prioritized());
    assert!(buffer.is_empty());
    Ok(())
}

// Learner loop with a synthetic error: transitions with a large observation value
// report large errors and should be drawn more often once priorities are updated.
#[test]
fn test_learner_loop_prefers_large_errors() -> Result<()> {
    init();
    let capacity = 64;
    let batch_size = 16;
    let config = ReplayBufferConfig::default()
        .capacity(capacity)
        .seed(7)
        .per_config(Some(PerConfig::default().alpha(1.0).beta_increment(0.01)));
    let mut buffer = ReplayBuffer::<Transition>::build(&config)?;
    let mut rng = StdRng::seed_from_u64(7);

    for i in 0..capacity {
        buffer.push(transition(i))?;
    }

    let mut n_high = 0;
    let mut n_total = 0;
    for step in 0..200 {
        let batch = buffer.batch(batch_size)?;
        assert_eq!(batch.len(), batch_size);
        let weight = batch.weight.as_ref().expect("prioritized batches carry weights");
        assert!(weight.iter().all(|&w| w > 0.0 && w <= 1.0 + 1e-5));

        let td_errs = batch
            .transitions
            .iter()
            .map(|tr| {
                let err = if tr.obs[0] >= 48.0 { 1.0 } else { 0.05 };
                err * rng.gen_range(0.9..1.1)
            })
            .collect::<Vec<f32>>();
        buffer.update_priority(&batch.ix_sample, &td_errs)?;

        if step >= 100 {
            n_high += batch.transitions.iter().filter(|tr| tr.obs[0] >= 48.0).count();
            n_total += batch.len();
        }
    }

    // a quarter of the transitions hold most of the priority mass
    assert!(n_high as f32 / n_total as f32 > 0.6);
    Ok(())
}

#[test]
fn test_mismatched_update() -> Result<()> {
    init();
    let mut buffer = ReplayBuffer::<Transition>::build(&per_config())?;
    buffer.push(transition(0))?;
    let batch = buffer.batch(2)?;
    let err = buffer.update_priority(&batch.ix_sample, &[0.1]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PerError>(),
        Some(&PerError::LengthMismatch {
            n_ixs: 2,
            n_errs: 1
        })
    );
    Ok(())
}
