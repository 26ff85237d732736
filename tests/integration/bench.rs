//! Shared fixture: a configured test plus a simulated board.

use etest::adapters::sim::{BoardFaults, SimBoard, SimJig, SimTarget};
use etest::{ElectricalTest, JigConfig};

pub struct Bench {
    pub config: JigConfig,
    pub test: ElectricalTest,
    pub board: SimBoard,
    pub target: SimTarget,
    pub jig: SimJig,
}

impl Bench {
    pub fn with_faults(faults: BoardFaults) -> Self {
        let config = JigConfig::default();
        let test = ElectricalTest::try_new(&config).expect("stock config is valid");
        let board = SimBoard::new(&config, faults);
        let (target, jig) = (board.target(), board.jig());
        Self {
            config,
            test,
            board,
            target,
            jig,
        }
    }

    pub fn healthy() -> Self {
        Self::with_faults(BoardFaults::default())
    }

    /// Powered and initialised, ready for a single stage.
    pub fn powered(faults: BoardFaults) -> Self {
        let mut bench = Self::with_faults(faults);
        bench
            .test
            .power_on(&mut bench.target, &mut bench.jig)
            .expect("power on");
        bench.test.init_target(&mut bench.target).expect("init");
        bench
    }
}
