/// Birthday cake with candles to blow out, one click each.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlowOutcome {
    /// Out of range or already out.
    Ignored,
    /// This candle went out; `all_out` is set on the last one, once.
    Extinguished { candle: usize, all_out: bool },
}

pub struct Cake {
    lit: Vec<bool>,
    blown: usize,
}

impl Cake {
    pub fn new(candle_count: usize) -> Self {
        Cake { lit: vec![true; candle_count], blown: 0 }
    }

    pub fn blow(&mut self, candle: usize) -> BlowOutcome {
        match self.lit.get_mut(candle) {
            Some(lit) if *lit => *lit = false,
            _ => return BlowOutcome::Ignored,
        }
        self.blown += 1;
        BlowOutcome::Extinguished {
            candle,
            all_out: self.blown == self.lit.len(),
        }
    }

    pub fn is_lit(&self, candle: usize) -> bool {
        self.lit.get(candle).copied().unwrap_or(false)
    }

    pub fn candle_count(&self) -> usize { self.lit.len() }
    pub fn blown(&self) -> usize { self.blown }
    pub fn all_out(&self) -> bool { self.blown == self.lit.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_candle_counts_once() {
        let mut cake = Cake::new(3);
        assert_eq!(cake.blow(1), BlowOutcome::Extinguished { candle: 1, all_out: false });
        assert_eq!(cake.blow(1), BlowOutcome::Ignored);
        assert_eq!(cake.blow(1), BlowOutcome::Ignored);
        assert_eq!(cake.blown(), 1);
        assert!(!cake.is_lit(1));
        assert!(cake.is_lit(0));
    }

    #[test]
    fn last_candle_reports_all_out_once() {
        let mut cake = Cake::new(3);
        cake.blow(2);
        cake.blow(0);
        assert_eq!(cake.blow(1), BlowOutcome::Extinguished { candle: 1, all_out: true });
        assert!(cake.all_out());
        assert_eq!(cake.blow(1), BlowOutcome::Ignored);
        assert_eq!(cake.blown(), 3);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut cake = Cake::new(3);
        assert_eq!(cake.blow(3), BlowOutcome::Ignored);
        assert_eq!(cake.blown(), 0);
        assert!(!cake.is_lit(7));
    }

    #[test]
    fn counter_never_exceeds_candle_count() {
        let mut cake = Cake::new(4);
        for round in 0..5 {
            for i in 0..4 {
                cake.blow((i + round) % 4);
            }
        }
        assert_eq!(cake.blown(), 4);
    }
}
