use rand::SeedableRng;
use hmmfix::alignment::{AlignedBlock, AlignedSequence, Profile};
use hmmfix::gen_seq;
fn main() -> Result<(), hmmfix::CorrectionError> {
    env_logger::init();
    let args: Vec<_> = std::env::args().collect();
    if args.len() < 5 {
        eprintln!("Usage: benchmark [LEN] [SEED] [COVERAGE] [ERROR_RATE]");
        return Ok(());
    }
    let parse_error = |what: &str| std::io::Error::new(std::io::ErrorKind::InvalidInput, what.to_string());
    let len: usize = args[1].parse().map_err(|_| parse_error("LEN"))?;
    let seed: u64 = args[2].parse().map_err(|_| parse_error("SEED"))?;
    let coverage: usize = args[3].parse().map_err(|_| parse_error("COVERAGE"))?;
    let error_rate: f64 = args[4].parse().map_err(|_| parse_error("ERROR_RATE"))?;
    let mut rng: rand_xoshiro::Xoroshiro128PlusPlus = SeedableRng::seed_from_u64(seed);
    let template: Vec<_> = gen_seq::generate_seq(&mut rng, len);
    let goods: Vec<_> = (0..coverage)
        .map(|_| gen_seq::introduce_randomness(&template, &mut rng, &gen_seq::CCS_PROFILE))
        .collect();
    let prof = gen_seq::PROFILE.mul(error_rate / gen_seq::PROFILE.sum());
    let query = gen_seq::introduce_randomness(&template, &mut rng, &prof);
    let (goods, query) = gen_seq::add_insertions(&goods, &query, &mut rng, error_rate / 2f64);
    let rows: Vec<_> = goods
        .into_iter()
        .enumerate()
        .map(|(i, seq)| AlignedSequence::new(format!("good{}", i), seq))
        .collect();
    let block = AlignedBlock {
        goods: Profile::new(rows)?,
        query: AlignedSequence::new("bad", query.clone()),
    };
    let start = std::time::Instant::now();
    let corrected = hmmfix::correct_alignment(&block, &hmmfix::CorrectionConfig::default())?;
    let end = std::time::Instant::now();
    let time = (end - start).as_millis();
    let ungapped: Vec<_> = query.iter().filter(|&&b| b != hmmfix::GAP).copied().collect();
    let before = edit_dist(&template, &ungapped);
    let after = edit_dist(&template, &corrected.record.1);
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        len, seed, coverage, error_rate, corrected.summary.states, time, before, after
    );
    Ok(())
}

fn edit_dist(x1: &[u8], x2: &[u8]) -> u32 {
    let mut dp = vec![vec![0; x2.len() + 1]; x1.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i as u32;
    }
    for j in 0..=x2.len() {
        dp[0][j] = j as u32;
    }
    for (i, x1_b) in x1.iter().enumerate() {
        for (j, x2_b) in x2.iter().enumerate() {
            let m = if x1_b == x2_b { 0 } else { 1 };
            dp[i + 1][j + 1] = (dp[i][j + 1] + 1).min(dp[i + 1][j] + 1).min(dp[i][j] + m);
        }
    }
    dp[x1.len()][x2.len()]
}
