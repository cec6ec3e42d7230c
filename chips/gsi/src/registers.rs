// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Bit layouts of the GSI v3.0 registers.
//!
//! Only registers that software decodes or composes field by field are
//! described here. Everything else is accessed as a raw `u32`. On older
//! hardware the registers whose layout changed in v3.0 are raw only.

use tock_registers::register_bitfields;

register_bitfields![u32,
    pub GSI_CFG [
        GSI_ENABLE OFFSET(0) NUMBITS(1) [],
        MCS_ENABLE OFFSET(1) NUMBITS(1) [],
        DOUBLE_MCS_CLK_FREQ OFFSET(2) NUMBITS(1) [],
        UC_IS_MCS OFFSET(3) NUMBITS(1) [],
        GSI_PWR_CLPS OFFSET(4) NUMBITS(1) [],
        BP_MTRIX_DISABLE OFFSET(5) NUMBITS(1) [],
        SLEEP_CLK_DIV OFFSET(8) NUMBITS(4) []
    ],

    pub CH_CNTXT_0 [
        CHTYPE_PROTOCOL OFFSET(0) NUMBITS(7) [
            Mhi = 0,
            Xhci = 1,
            Gpi = 2,
            Xdci = 3,
            Wdi2 = 4,
            Gci = 5,
            Wdi3 = 6,
            Mhip = 7,
            Aqc = 8,
            Ad11 = 9
        ],
        CHTYPE_DIR OFFSET(7) NUMBITS(1) [
            FromGsi = 0,
            ToGsi = 1
        ],
        EE OFFSET(8) NUMBITS(4) [],
        CHID OFFSET(12) NUMBITS(8) [],
        CHSTATE OFFSET(20) NUMBITS(4) [],
        ELEMENT_SIZE OFFSET(24) NUMBITS(8) []
    ],

    pub CH_CNTXT_1 [
        R_LENGTH OFFSET(0) NUMBITS(24) [],
        ERINDEX OFFSET(24) NUMBITS(8) []
    ],

    pub CH_QOS [
        WRR_WEIGHT OFFSET(0) NUMBITS(4) [],
        MAX_PREFETCH OFFSET(8) NUMBITS(1) [
            OneElement = 0,
            TwoElements = 1
        ],
        USE_DB_ENG OFFSET(9) NUMBITS(1) [],
        PREFETCH_MODE OFFSET(10) NUMBITS(4) [
            UseCase = 0,
            Escape = 1,
            SmartPrefetch = 2,
            FreePrefetch = 3
        ],
        EMPTY_LVL_THRSHOLD OFFSET(16) NUMBITS(8) [],
        DB_IN_BYTES OFFSET(24) NUMBITS(1) [],
        LOW_LATENCY_EN OFFSET(25) NUMBITS(1) []
    ],

    pub EV_CNTXT_0 [
        CHTYPE OFFSET(0) NUMBITS(7) [],
        INTYPE OFFSET(7) NUMBITS(1) [
            Msi = 0,
            Irq = 1
        ],
        EVCHID OFFSET(8) NUMBITS(8) [],
        EE OFFSET(16) NUMBITS(4) [],
        CHSTATE OFFSET(20) NUMBITS(4) [],
        ELEMENT_SIZE OFFSET(24) NUMBITS(8) []
    ],

    pub EV_CNTXT_1 [
        R_LENGTH OFFSET(0) NUMBITS(24) []
    ],

    pub EV_CNTXT_8 [
        INT_MODT OFFSET(0) NUMBITS(16) [],
        INT_MODC OFFSET(16) NUMBITS(8) [],
        INT_MOD_CNT OFFSET(24) NUMBITS(8) []
    ],

    pub CH_CMD [
        CHID OFFSET(0) NUMBITS(8) [],
        OPCODE OFFSET(24) NUMBITS(8) [
            Allocate = 0x0,
            Start = 0x1,
            Stop = 0x2,
            Reset = 0x9,
            DeAlloc = 0xa,
            DbStop = 0xb
        ]
    ],

    pub EV_CH_CMD [
        CHID OFFSET(0) NUMBITS(8) [],
        OPCODE OFFSET(24) NUMBITS(8) [
            Allocate = 0x0,
            Reset = 0x9,
            DeAlloc = 0xa
        ]
    ],

    pub GENERIC_CMD [
        OPCODE OFFSET(0) NUMBITS(5) [
            Halt = 0x1,
            Alloc = 0x2,
            EnableFlowControl = 0x3,
            Disable = 0x4,
            Query = 0x5
        ],
        VIRT_CHAN_IDX OFFSET(5) NUMBITS(8) [],
        EE OFFSET(13) NUMBITS(4) []
    ],

    pub HW_PARAM_2 [
        NUM_CH_PER_EE OFFSET(0) NUMBITS(8) [],
        IRAM_SIZE OFFSET(8) NUMBITS(5) [],
        CH_PEND_TRANSLATE OFFSET(13) NUMBITS(1) [],
        CH_FULL_LOGIC OFFSET(14) NUMBITS(1) [],
        USE_SDMA OFFSET(15) NUMBITS(1) [],
        SDMA_N_INT OFFSET(16) NUMBITS(3) [],
        SDMA_MAX_BURST OFFSET(19) NUMBITS(8) [],
        SDMA_N_IOVEC OFFSET(27) NUMBITS(3) [],
        USE_RD_WR_ENG OFFSET(30) NUMBITS(1) [],
        USE_INTER_EE OFFSET(31) NUMBITS(1) []
    ],

    pub HW_PARAM_4 [
        NUM_EV_PER_EE OFFSET(0) NUMBITS(8) [],
        IRAM_PROTCOL_CNT OFFSET(8) NUMBITS(8) []
    ],

    pub GSI_STATUS [
        ENABLED OFFSET(0) NUMBITS(1) []
    ],

    pub TYPE_IRQ [
        CH_CTRL OFFSET(0) NUMBITS(1) [],
        EV_CTRL OFFSET(1) NUMBITS(1) [],
        GLOB_EE OFFSET(2) NUMBITS(1) [],
        IEOB OFFSET(3) NUMBITS(1) [],
        INTER_EE_CH_CTRL OFFSET(4) NUMBITS(1) [],
        INTER_EE_EV_CTRL OFFSET(5) NUMBITS(1) [],
        GENERAL OFFSET(6) NUMBITS(1) []
    ],

    pub GLOB_IRQ [
        ERROR_INT OFFSET(0) NUMBITS(1) [],
        GP_INT1 OFFSET(1) NUMBITS(1) [],
        GP_INT2 OFFSET(2) NUMBITS(1) [],
        GP_INT3 OFFSET(3) NUMBITS(1) []
    ],

    pub GSI_IRQ [
        BREAK_POINT OFFSET(0) NUMBITS(1) [],
        BUS_ERROR OFFSET(1) NUMBITS(1) [],
        CMD_FIFO_OVRFLOW OFFSET(2) NUMBITS(1) [],
        MCS_STACK_OVRFLOW OFFSET(3) NUMBITS(1) []
    ],

    pub SW_VERSION [
        STEP OFFSET(0) NUMBITS(16) [],
        MINOR OFFSET(16) NUMBITS(12) [],
        MAJOR OFFSET(28) NUMBITS(4) []
    ],

    pub VP_TABLE [
        PHY_CH OFFSET(0) NUMBITS(8) [],
        VALID OFFSET(8) NUMBITS(1) []
    ],

    pub MCS_CFG [
        MCS_ENABLE OFFSET(0) NUMBITS(1) []
    ],

    pub INTSET [
        INTYPE OFFSET(0) NUMBITS(1) [
            Msi = 0,
            Irq = 1
        ]
    ]
];
