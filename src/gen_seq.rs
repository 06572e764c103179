//! This module is to generate some random alignments to assess the performance.
//! Usually, it would not be used in the real-applications.
use crate::GAP;
use rand::seq::SliceRandom;
use rand::Rng;

/// Error rates of an aligned copy. Insertions are not part of it, since they
/// add columns to the alignment; see `add_insertions`.
#[derive(Debug, Clone, Copy)]
pub struct ErrorProfile {
    pub sub: f64,
    pub del: f64,
}

impl ErrorProfile {
    pub fn sum(&self) -> f64 {
        self.sub + self.del
    }
    pub fn mul(&self, x: f64) -> Self {
        Self {
            sub: self.sub * x,
            del: self.del * x,
        }
    }
}

pub const PROFILE: ErrorProfile = ErrorProfile {
    sub: 0.04,
    del: 0.04,
};

pub const CCS_PROFILE: ErrorProfile = ErrorProfile {
    sub: 0.002,
    del: 0.004,
};

#[derive(Debug, Clone, Copy)]
enum Op {
    Match,
    MisMatch,
    Del,
}
impl Op {
    fn weight(self, p: &ErrorProfile) -> f64 {
        match self {
            Op::Match => 1. - p.sub - p.del,
            Op::MisMatch => p.sub,
            Op::Del => p.del,
        }
    }
}
const OPERATIONS: [Op; 3] = [Op::Match, Op::MisMatch, Op::Del];

/// An aligned copy of `seq`: same width, substituted bases and gaps.
pub fn introduce_randomness<T: Rng>(seq: &[u8], rng: &mut T, p: &ErrorProfile) -> Vec<u8> {
    seq.iter()
        .map(|&base| match OPERATIONS.choose_weighted(rng, |e| e.weight(p)) {
            Ok(Op::MisMatch) => choose_base(rng, base),
            Ok(Op::Del) => GAP,
            _ => base,
        })
        .collect()
}

/// Insert columns where every row of `goods` has a gap and `query` has a random base.
/// Each column of the input is followed by such a column with probability `rate`.
pub fn add_insertions<T: Rng>(
    goods: &[Vec<u8>],
    query: &[u8],
    rng: &mut T,
    rate: f64,
) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut new_goods = vec![Vec::with_capacity(query.len() * 2); goods.len()];
    let mut new_query = Vec::with_capacity(query.len() * 2);
    for (column, &base) in query.iter().enumerate() {
        new_query.push(base);
        for (row, new_row) in goods.iter().zip(new_goods.iter_mut()) {
            new_row.push(row[column]);
        }
        if rng.gen_bool(rate) {
            new_query.push(random_base(rng));
            new_goods.iter_mut().for_each(|row| row.push(GAP));
        }
    }
    (new_goods, new_query)
}

pub fn generate_seq<T: Rng>(rng: &mut T, len: usize) -> Vec<u8> {
    let bases = b"ACTG";
    (0..len)
        .filter_map(|_| bases.choose(rng))
        .copied()
        .collect()
}

fn choose_base<T: Rng>(rng: &mut T, base: u8) -> u8 {
    let bases: Vec<u8> = b"ATCG".iter().filter(|&&e| e != base).copied().collect();
    bases.choose(rng).copied().unwrap_or(base)
}
fn random_base<T: Rng>(rng: &mut T) -> u8 {
    b"ATGC".choose(rng).copied().unwrap_or(b'A')
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn aligned_copies_keep_width() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4);
        let template = generate_seq(&mut rng, 200);
        let copy = introduce_randomness(&template, &mut rng, &PROFILE.mul(2f64));
        assert_eq!(copy.len(), template.len());
        let diff = copy.iter().zip(template.iter()).filter(|(x, y)| x != y).count();
        assert!(0 < diff && diff < 100, "{}", diff);
        let same = introduce_randomness(&template, &mut rng, &PROFILE.mul(0f64));
        assert_eq!(same, template);
    }
    #[test]
    fn insertion_columns() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(5);
        let template = generate_seq(&mut rng, 100);
        let goods = vec![template.clone(), template.clone()];
        let (goods, query) = add_insertions(&goods, &template, &mut rng, 0.2);
        assert!(template.len() < query.len());
        assert!(goods.iter().all(|row| row.len() == query.len()));
        let inserted = goods[0].iter().filter(|&&b| b == GAP).count();
        assert_eq!(inserted, query.len() - template.len());
    }
}
