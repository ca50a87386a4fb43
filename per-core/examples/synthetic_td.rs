//! Drives a replay buffer with a synthetic learner.
//!
//! Each transition carries a target value in its reward. The learner keeps one
//! estimate per observation, moves it towards the target with an importance-weighted
//! step and reports the remaining absolute error as the new priority.
use anyhow::Result;
use clap::Parser;
use log::info;
use per_core::{
    replay_buffer::{PerConfig, ReplayBuffer, ReplayBufferConfig},
    ExperienceBufferBase, ReplayBufferBase, Transition,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Train a table of estimates from a replay buffer
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of slots of the replay buffer
    #[arg(long, default_value_t = 1024)]
    capacity: usize,

    /// Number of transitions per batch
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Number of optimization steps
    #[arg(long, default_value_t = 2000)]
    n_opts: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Learning rate of the estimates
    #[arg(long, default_value_t = 0.5)]
    lr: f32,

    /// Sample uniformly instead of by priority
    #[arg(long, default_value_t = false)]
    uniform: bool,

    /// Load the replay buffer configuration from a YAML file
    #[arg(long)]
    config: Option<String>,

    /// Save the replay buffer configuration to a YAML file
    #[arg(long)]
    save_config: Option<String>,
}

fn buffer_config(args: &Args) -> Result<ReplayBufferConfig> {
    if let Some(path) = &args.config {
        return ReplayBufferConfig::load(path);
    }
    let per_config = (!args.uniform).then(PerConfig::default);
    Ok(ReplayBufferConfig::default()
        .capacity(args.capacity)
        .seed(args.seed)
        .per_config(per_config))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = buffer_config(&args)?;
    if let Some(path) = &args.save_config {
        config.save(path)?;
        info!("Saved the replay buffer configuration in {:?}", path);
    }
    let mut buffer = ReplayBuffer::<Transition>::build(&config)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    // Observation i has a target value; a few of them are far from the initial estimate.
    let n_obs = buffer.capacity();
    let mut estimates = vec![0f32; n_obs];
    for i in 0..n_obs {
        let target = if rng.gen_bool(0.05) { 10.0 } else { 0.1 };
        buffer.push(Transition::new(vec![i as f32], 0, target, vec![i as f32]))?;
    }

    for n_opts in 0..args.n_opts {
        let batch = buffer.batch(args.batch_size)?;
        let weight = batch.weight.clone().unwrap_or_else(|| vec![1.0; batch.len()]);

        let mut td_errs = Vec::with_capacity(batch.len());
        for (tr, w) in batch.transitions.iter().zip(weight.iter()) {
            let i = tr.obs[0] as usize;
            let td_err = tr.reward - estimates[i];
            estimates[i] += args.lr * w * td_err;
            td_errs.push(td_err.abs());
        }
        buffer.update_priority(&batch.ix_sample, &td_errs)?;

        if (n_opts + 1) % 500 == 0 {
            let mse = (0..n_obs)
                .filter_map(|i| {
                    buffer_reward(&buffer, i).map(|r| (r - estimates[i]).powi(2))
                })
                .sum::<f32>()
                / n_obs as f32;
            info!("opt steps = {}, mse = {:.5}", n_opts + 1, mse);
        }
    }

    Ok(())
}

fn buffer_reward(buffer: &ReplayBuffer<Transition>, slot: usize) -> Option<f32> {
    match buffer {
        ReplayBuffer::Uniform(b) => b.get(slot).map(|tr| tr.reward),
        ReplayBuffer::Prioritized(b) => b.sum_tree().get(slot).map(|tr| tr.reward),
    }
}
