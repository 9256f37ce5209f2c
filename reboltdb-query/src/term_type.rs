//! Operator codes.
//!
//! The numeric codes are the ql2 `Term.TermType` values and are a wire
//! compatibility constraint; they must not be renumbered. Each operator
//! declares the static type of its result where one is known. Operators
//! with no declared type are accepted by the term parser and left to the
//! compile stage; ERROR never produces a value.

use crate::types::TypeFlag;

macro_rules! term_types {
    ($($code:literal $variant:ident $name:literal => $ret:expr,)+) => {
        /// A query operator tag, numerically identical to ql2 `Term.TermType`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum TermType {
            $($variant = $code,)+
        }

        impl TermType {
            /// Decodes a wire operator code.
            pub fn from_wire(code: i64) -> Option<TermType> {
                match code {
                    $($code => Some(TermType::$variant),)+
                    _ => None,
                }
            }

            /// The wire name of the operator, used in diagnostics and the
            /// term pretty-printer.
            pub fn name(self) -> &'static str {
                match self {
                    $(TermType::$variant => $name,)+
                }
            }

            /// The declared result type of the operator, where one is known.
            pub fn return_type(self) -> Option<TypeFlag> {
                match self {
                    $(TermType::$variant => $ret,)+
                }
            }
        }
    };
}

term_types! {
    1   Datum            "DATUM"             => None,
    2   MakeArray        "MAKE_ARRAY"        => Some(TypeFlag::ARRAY),
    3   MakeObj          "MAKE_OBJ"          => Some(TypeFlag::OBJECT),
    10  Var              "VAR"               => Some(TypeFlag::DATUM),
    11  Javascript       "JAVASCRIPT"        => None,
    12  Error            "ERROR"             => None,
    13  ImplicitVar      "IMPLICIT_VAR"      => Some(TypeFlag::DATUM),
    14  Db               "DB"                => Some(TypeFlag::DATABASE),
    15  Table            "TABLE"             => Some(TypeFlag::TABLE),
    16  Get              "GET"               => Some(TypeFlag::SELECTION),
    17  Eq               "EQ"                => Some(TypeFlag::BOOL),
    18  Ne               "NE"                => Some(TypeFlag::BOOL),
    19  Lt               "LT"                => Some(TypeFlag::BOOL),
    20  Le               "LE"                => Some(TypeFlag::BOOL),
    21  Gt               "GT"                => Some(TypeFlag::BOOL),
    22  Ge               "GE"                => Some(TypeFlag::BOOL),
    23  Not              "NOT"               => Some(TypeFlag::BOOL),
    24  Add              "ADD"               => Some(TypeFlag::NUMBER | TypeFlag::STRING | TypeFlag::TIME),
    25  Sub              "SUB"               => Some(TypeFlag::NUMBER | TypeFlag::TIME),
    26  Mul              "MUL"               => Some(TypeFlag::NUMBER | TypeFlag::ARRAY),
    27  Div              "DIV"               => Some(TypeFlag::NUMBER),
    28  Mod              "MOD"               => Some(TypeFlag::NUMBER),
    29  Append           "APPEND"            => Some(TypeFlag::ARRAY),
    30  Slice            "SLICE"             => Some(TypeFlag::STRING | TypeFlag::BINARY | TypeFlag::ARRAY | TypeFlag::STREAM | TypeFlag::SELECTION_STREAM),
    31  GetField         "GET_FIELD"         => None,
    32  HasFields        "HAS_FIELDS"        => None,
    33  Pluck            "PLUCK"             => None,
    34  Without          "WITHOUT"           => None,
    35  Merge            "MERGE"             => None,
    36  BetweenDeprecated "BETWEEN_DEPRECATED" => None,
    37  Reduce           "REDUCE"            => None,
    38  Map              "MAP"               => None,
    39  Filter           "FILTER"            => None,
    40  ConcatMap        "CONCAT_MAP"        => None,
    41  OrderBy          "ORDER_BY"          => None,
    42  Distinct         "DISTINCT"          => None,
    43  Count            "COUNT"             => None,
    44  Union            "UNION"             => None,
    45  Nth              "NTH"               => None,
    48  InnerJoin        "INNER_JOIN"        => None,
    49  OuterJoin        "OUTER_JOIN"        => None,
    50  EqJoin           "EQ_JOIN"           => None,
    51  CoerceTo         "COERCE_TO"         => None,
    52  TypeOf           "TYPE_OF"           => None,
    53  Update           "UPDATE"            => None,
    54  Delete           "DELETE"            => None,
    55  Replace          "REPLACE"           => None,
    56  Insert           "INSERT"            => None,
    57  DbCreate         "DB_CREATE"         => None,
    58  DbDrop           "DB_DROP"           => None,
    59  DbList           "DB_LIST"           => None,
    60  TableCreate      "TABLE_CREATE"      => None,
    61  TableDrop        "TABLE_DROP"        => None,
    62  TableList        "TABLE_LIST"        => None,
    64  Funcall          "FUNCALL"           => None,
    65  Branch           "BRANCH"            => None,
    66  Or               "OR"                => None,
    67  And              "AND"               => None,
    68  ForEach          "FOR_EACH"          => None,
    69  Func             "FUNC"              => None,
    70  Skip             "SKIP"              => Some(TypeFlag::STREAM | TypeFlag::ARRAY),
    71  Limit            "LIMIT"             => Some(TypeFlag::STREAM | TypeFlag::ARRAY),
    72  Zip              "ZIP"               => None,
    73  Asc              "ASC"               => None,
    74  Desc             "DESC"              => None,
    75  IndexCreate      "INDEX_CREATE"      => None,
    76  IndexDrop        "INDEX_DROP"        => None,
    77  IndexList        "INDEX_LIST"        => None,
    78  GetAll           "GET_ALL"           => Some(TypeFlag::SELECTION_STREAM),
    79  Info             "INFO"              => None,
    80  Prepend          "PREPEND"           => Some(TypeFlag::ARRAY),
    81  Sample           "SAMPLE"            => None,
    82  InsertAt         "INSERT_AT"         => None,
    83  DeleteAt         "DELETE_AT"         => None,
    84  ChangeAt         "CHANGE_AT"         => None,
    85  SpliceAt         "SPLICE_AT"         => None,
    86  IsEmpty          "IS_EMPTY"          => None,
    87  OffsetsOf        "OFFSETS_OF"        => Some(TypeFlag::ARRAY),
    88  SetInsert        "SET_INSERT"        => Some(TypeFlag::ARRAY),
    89  SetIntersection  "SET_INTERSECTION"  => Some(TypeFlag::ARRAY),
    90  SetUnion         "SET_UNION"         => Some(TypeFlag::ARRAY),
    91  SetDifference    "SET_DIFFERENCE"    => Some(TypeFlag::ARRAY),
    92  Default          "DEFAULT"           => None,
    93  Contains         "CONTAINS"          => Some(TypeFlag::BOOL),
    94  Keys             "KEYS"              => None,
    95  Difference       "DIFFERENCE"        => Some(TypeFlag::ARRAY),
    96  WithFields       "WITH_FIELDS"       => None,
    97  Match            "MATCH"             => None,
    98  Json             "JSON"              => None,
    99  Iso8601          "ISO8601"           => None,
    100 ToIso8601        "TO_ISO8601"        => None,
    101 EpochTime        "EPOCH_TIME"        => None,
    102 ToEpochTime      "TO_EPOCH_TIME"     => None,
    103 Now              "NOW"               => None,
    104 InTimezone       "IN_TIMEZONE"       => None,
    105 During           "DURING"            => None,
    106 Date             "DATE"              => None,
    107 Monday           "MONDAY"            => None,
    108 Tuesday          "TUESDAY"           => None,
    109 Wednesday        "WEDNESDAY"         => None,
    110 Thursday         "THURSDAY"          => None,
    111 Friday           "FRIDAY"            => None,
    112 Saturday         "SATURDAY"          => None,
    113 Sunday           "SUNDAY"            => None,
    114 January          "JANUARY"           => None,
    115 February         "FEBRUARY"          => None,
    116 March            "MARCH"             => None,
    117 April            "APRIL"             => None,
    118 May              "MAY"               => None,
    119 June             "JUNE"              => None,
    120 July             "JULY"              => None,
    121 August           "AUGUST"            => None,
    122 September        "SEPTEMBER"         => None,
    123 October          "OCTOBER"           => None,
    124 November         "NOVEMBER"          => None,
    125 December         "DECEMBER"          => None,
    126 TimeOfDay        "TIME_OF_DAY"       => None,
    127 Timezone         "TIMEZONE"          => None,
    128 Year             "YEAR"              => None,
    129 Month            "MONTH"             => None,
    130 Day              "DAY"               => None,
    131 DayOfWeek        "DAY_OF_WEEK"       => None,
    132 DayOfYear        "DAY_OF_YEAR"       => None,
    133 Hours            "HOURS"             => None,
    134 Minutes          "MINUTES"           => None,
    135 Seconds          "SECONDS"           => None,
    136 Time             "TIME"              => None,
    137 Literal          "LITERAL"           => None,
    138 Sync             "SYNC"              => None,
    139 IndexStatus      "INDEX_STATUS"      => None,
    140 IndexWait        "INDEX_WAIT"        => None,
    141 Upcase           "UPCASE"            => None,
    142 Downcase         "DOWNCASE"          => None,
    143 Object           "OBJECT"            => None,
    144 Group            "GROUP"             => None,
    145 Sum              "SUM"               => None,
    146 Avg              "AVG"               => None,
    147 Min              "MIN"               => None,
    148 Max              "MAX"               => None,
    149 Split            "SPLIT"             => None,
    150 Ungroup          "UNGROUP"           => None,
    151 Random           "RANDOM"            => None,
    152 Changes          "CHANGES"           => None,
    153 Http             "HTTP"              => None,
    154 Args             "ARGS"              => None,
    155 Binary           "BINARY"            => None,
    156 IndexRename      "INDEX_RENAME"      => None,
    157 Geojson          "GEOJSON"           => None,
    158 ToGeojson        "TO_GEOJSON"        => None,
    159 Point            "POINT"             => None,
    160 Line             "LINE"              => None,
    161 Polygon          "POLYGON"           => None,
    162 Distance         "DISTANCE"          => None,
    163 Intersects       "INTERSECTS"        => None,
    164 Includes         "INCLUDES"          => None,
    165 Circle           "CIRCLE"            => None,
    166 GetIntersecting  "GET_INTERSECTING"  => None,
    167 Fill             "FILL"              => None,
    168 GetNearest       "GET_NEAREST"       => None,
    169 Uuid             "UUID"              => Some(TypeFlag::STRING),
    170 Bracket          "BRACKET"           => None,
    171 PolygonSub       "POLYGON_SUB"       => None,
    172 ToJsonString     "TO_JSON_STRING"    => None,
    173 Range            "RANGE"             => None,
    174 Config           "CONFIG"            => None,
    175 Status           "STATUS"            => None,
    176 Reconfigure      "RECONFIGURE"       => None,
    177 Wait             "WAIT"              => None,
    179 Rebalance        "REBALANCE"         => None,
    180 Minval           "MINVAL"            => None,
    181 Maxval           "MAXVAL"            => None,
    182 Between          "BETWEEN"           => None,
    183 Floor            "FLOOR"             => Some(TypeFlag::NUMBER),
    184 Ceil             "CEIL"              => Some(TypeFlag::NUMBER),
    185 Round            "ROUND"             => Some(TypeFlag::NUMBER),
    186 Values           "VALUES"            => None,
    187 Fold             "FOLD"              => None,
    188 Grant            "GRANT"             => None,
    189 SetWriteHook     "SET_WRITE_HOOK"    => None,
    190 GetWriteHook     "GET_WRITE_HOOK"    => None,
    191 BitAnd           "BIT_AND"           => None,
    192 BitOr            "BIT_OR"            => None,
    193 BitXor           "BIT_XOR"           => None,
    194 BitNot           "BIT_NOT"           => None,
    195 BitSal           "BIT_SAL"           => None,
    196 BitSar           "BIT_SAR"           => None,
}

impl TermType {
    /// Operators the server refuses to compile (embedded scripting and
    /// outbound HTTP are out of scope permanently).
    pub fn is_unsupported(self) -> bool {
        matches!(self, TermType::Javascript | TermType::Http)
    }
}
