//! End-to-end tests for the Go backend: parse a snippet, emit it, and
//! check the generated source.

use pretty_assertions::assert_eq;
use snowpc::emit::{GoEmitter, Metadata};

fn compile(src: &str) -> String {
    let root = snowpc::parse(src, "test.snowp").expect("parse");
    let mut buf = Vec::new();
    let mut g = GoEmitter::new(
        Metadata {
            package: "testpkg".to_owned(),
            input_name: "test.snowp".to_owned(),
        },
        &mut buf,
    );
    g.emit(&root);
    drop(g);
    String::from_utf8(buf).expect("utf8 output")
}

fn preamble(imports: &[&str]) -> String {
    let mut out = format!(
        "// Auto-generated to Go types and interfaces using {} {} ({})\n\
         //  Input file:test.snowp\n\
         \n\
         package testpkg\n\
         \n\
         import (\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_REPOSITORY"),
    );
    for imp in imports {
        out.push_str(&format!("\t\"{}\"\n", imp));
    }
    out.push_str(")\n\n");
    out
}

#[test]
fn empty_file_is_preamble_only() {
    let out = compile("");
    assert_eq!(out, preamble(&[]));
    assert!(!out.contains("func init()"));
}

#[test]
fn single_typedef() {
    let out = compile("typedef Foo = Uint;");
    assert!(out.starts_with(&preamble(&["github.com/foks-proj/go-snowpack-rpc/rpc"])));
    assert!(out.contains("type Foo uint64\n"));
    assert!(out.contains("type FooInternal__ uint64\n"));
    assert!(out.contains(
        "func (f Foo) Export() *FooInternal__ {\n\
         \ttmp := ((uint64)(f))\n\
         \treturn ((*FooInternal__)(&tmp))\n\
         }\n"
    ));
    assert!(out.contains(
        "func (f FooInternal__) Import() Foo {\n\
         \ttmp := (uint64)(f)\n\
         \treturn Foo((func (x *uint64) (ret uint64) {\n\
         \t\tif x == nil {\n\
         \t\t\treturn ret\n\
         \t\t}\n\
         \t\treturn *x\n\
         \t})(&tmp))\n\
         }\n"
    ));
    assert!(out.contains("func (f *Foo) Encode(enc rpc.Encoder) error {"));
    assert!(out.contains("func (f *Foo) Decode(dec rpc.Decoder) error {"));
    assert!(out.contains(
        "func (f Foo) Bytes() []byte {\n\
         \treturn nil\n\
         }\n"
    ));
    // No unique id declared: no registration postamble.
    assert!(!out.contains("func init()"));
}

#[test]
fn typedef_unique_id_is_registered() {
    let out = compile("typedef Foo = Uint @0xdeadbeefdeadbeef;");
    assert!(out.contains("var FooTypeUniqueID = rpc.TypeUniqueID(0xdeadbeefdeadbeef)\n"));
    assert!(out.contains(
        "func (f *Foo) GetTypeUniqueID() rpc.TypeUniqueID {\n\
         \treturn FooTypeUniqueID\n\
         }\n"
    ));
    assert!(out.contains(
        "func init() {\n\
         \trpc.AddUnique(FooTypeUniqueID)\n\
         }\n"
    ));
}

#[test]
fn struct_with_position_gap() {
    let out = compile("struct S { a @0: Uint, c @2: Text }");
    assert!(out.contains(
        "type S struct {\n\
         \tA uint64\n\
         \tC string\n\
         }\n"
    ));
    // The internal twin has three slots: A, a deprecated placeholder, C.
    assert!(out.contains(
        "type SInternal__ struct {\n\
         \t_struct struct{} `codec:\",toarray\"` //lint:ignore U1000 msgpack internal field\n\
         \tA *uint64\n\
         \tDeprecated1 *struct{}\n\
         \tC *string\n\
         }\n"
    ));
    assert!(out.contains(
        "func (s S) Export() *SInternal__ {\n\
         \treturn &SInternal__ {\n\
         \t\tA: &s.A,\n\
         \t\tC: &s.C,\n\
         \t}\n\
         }\n"
    ));
    assert!(out.contains("func (s *S) Bytes() []byte { return nil }\n"));
}

#[test]
fn enum_statement() {
    let out = compile("enum St { A @0; B @1; }");
    assert!(out.contains("type St int\n"));
    assert!(out.contains(
        "const (\n\
         \tSt_A St = 0\n\
         \tSt_B St = 1\n\
         )\n"
    ));
    assert!(out.contains(
        "var StMap = map[string]St{\n\
         \t\"A\" : 0,\n\
         \t\"B\" : 1,\n\
         }\n"
    ));
    assert!(out.contains(
        "var StRevMap = map[St]string{\n\
         \t0 : \"A\",\n\
         \t1 : \"B\",\n\
         }\n"
    ));
    assert!(out.contains("type StInternal__ St\n"));
    assert!(out.contains(
        "func (s StInternal__) Import() St {\n\
         \treturn St(s)\n\
         }\n"
    ));
    assert!(out.contains(
        "func (s St) Export() *StInternal__ {\n\
         \treturn ((*StInternal__)(&s))\n\
         }\n"
    ));
}

#[test]
fn variant_with_default() {
    let out = compile("variant V switch (s: St) { case A @1: Uint; default: void; }");

    assert!(out.contains(
        "type V struct {\n\
         \tS St\n\
         \tF_1__ *uint64 `json:\"f1,omitempty\"`\n\
         }\n"
    ));
    assert!(out.contains(
        "type VInternalSwitch__ struct {\n\
         \t_struct struct{} `codec:\",omitempty\"` //lint:ignore U1000 msgpack internal field\n\
         \tF_1__ *uint64 `codec:\"1\"`\n\
         }\n"
    ));
    assert!(out.contains(
        "func (v V) GetS() (ret St, err error) {\n\
         \tswitch v.S {\n\
         \t\tcase St_A:\n\
         \t\t\tif v.F_1__ == nil {\n\
         \t\t\t\treturn ret, errors.New(\"unexpected nil case for F_1__\")\n\
         \t\t\t}\n\
         \t\tdefault:\n\
         \t\t\tbreak\n\
         \t}\n\
         \treturn v.S, nil\n\
         }\n"
    ));
    // Wrong-label getters panic with the getter name and the live value.
    assert!(out.contains(
        "func (v V) A() uint64 {\n\
         \tif v.F_1__ == nil {\n\
         \t\tpanic(\"unexpected nil case; should have been checked\")\n\
         \t}\n\
         \tif v.S != St_A {\n\
         \t\tpanic(fmt.Sprintf(\"unexpected switch value (%v) when A is called\", v.S))\n\
         \t}\n\
         \treturn *v.F_1__\n\
         }\n"
    ));
    assert!(out.contains(
        "func NewVWithA(v uint64) V {\n\
         \treturn V{\n\
         \t\tS: St_A,\n\
         \t\tF_1__: &v,\n\
         \t}\n\
         }\n"
    ));
    // The default constructor takes the discriminator as a parameter and
    // carries no payload.
    assert!(out.contains(
        "func NewVDefault(s St) V {\n\
         \treturn V{\n\
         \t\tS: s,\n\
         \t}\n\
         }\n"
    ));
    assert!(out.contains(
        "func (v VInternal__) Import() V {\n\
         \treturn V{\n\
         \t\tS: v.S,\n\
         \t\tF_1__: v.Switch__.F_1__,\n\
         \t}\n\
         }\n"
    ));
    assert!(out.contains(
        "func (v V) Export() *VInternal__ {\n\
         \treturn &VInternal__{\n\
         \t\tS: v.S,\n\
         \t\tSwitch__: VInternalSwitch__{\n\
         \t\t\tF_1__: v.F_1__,\n\
         \t\t},\n\
         \t}\n\
         }\n"
    ));
}

#[test]
fn variant_without_default_rejects_unknown_discriminator() {
    let out = compile("variant U switch (s: St) { case A @0: Uint; }");
    // No declared default arm: the switch accessor gets a synthesized one
    // that errors on an unrecognized discriminator.
    assert!(out.contains(
        "func (u U) GetS() (ret St, err error) {\n\
         \tswitch u.S {\n\
         \t\tcase St_A:\n\
         \t\t\tif u.F_0__ == nil {\n\
         \t\t\t\treturn ret, errors.New(\"unexpected nil case for F_0__\")\n\
         \t\t\t}\n\
         \t\tdefault:\n\
         \t\t\treturn ret, fmt.Errorf(\"unexpected switch value (%v)\", u.S)\n\
         \t}\n\
         \treturn u.S, nil\n\
         }\n"
    ));
}

#[test]
fn snake_case_labels_camel_case_accessors() {
    let out = compile("variant V switch (s: St) { case NO_KEY @0: Uint; }");
    assert!(out.contains("case St_NO_KEY:"));
    assert!(out.contains("func (v V) NoKey() uint64 {"));
    assert!(out.contains(
        "panic(fmt.Sprintf(\"unexpected switch value (%v) when NoKey is called\", v.S))"
    ));
    assert!(out.contains("func NewVWithNoKey(v uint64) V {"));
}

#[test]
fn variant_bool_and_int_labels() {
    let out = compile(
        "variant W switch (b: Bool) { case true @0: Uint; case false: void; }\n\
         variant X switch (n: Int) { case 3 @0: Text; case -4: void; }",
    );
    // Bool labels get True/False getters with inverted guards.
    assert!(out.contains("func (w W) True() uint64 {"));
    assert!(out.contains("\tif !w.B {\n"));
    assert!(out.contains("func NewWWithTrue(v uint64) W {"));
    // Integer labels camel-case as P{n}/N{n}.
    assert!(out.contains("func (x X) P3() string {"));
    assert!(out.contains("\tif x.N != 3 {\n"));
    assert!(out.contains("func NewXWithP3(v string) X {"));
    assert!(out.contains("case 3:"));
}

#[test]
fn future_typedef_link() {
    let out = compile("typedef Sig = Future(Payload);");
    assert!(out.contains("type Sig []byte\n"));
    assert!(out.contains("type SigInternal__ []byte\n"));
    assert!(out.contains(
        "func (s *Sig) AllocAndDecode(f rpc.DecoderFactory) (*Payload, error) {\n\
         \tvar ret Payload\n\
         \tsrc := f.NewDecoderBytes(&ret, s.Bytes())\n\
         \tif err := ret.Decode(src); err != nil {\n\
         \t\treturn nil, err\n\
         \t}\n\
         \treturn &ret, nil\n\
         }\n"
    ));
    assert!(out.contains("func (s *Sig) AssertNormalized() error { return nil }\n"));
    assert!(out.contains(
        "func (s *Payload) EncodeTyped(f rpc.EncoderFactory) (*Sig, error) {\n\
         \tvar tmp []byte\n\
         \tenc := f.NewEncoderBytes(&tmp)\n\
         \tif err := enc.Encode(enc); err != nil {\n\
         \t\treturn nil, err\n\
         \t}\n\
         \tret := Sig(tmp)\n\
         \treturn &ret, nil\n\
         }\n"
    ));
    assert!(out.contains(
        "func (s *Payload)  ChildBlob(__b []byte) Sig {\n\
         \treturn Sig(__b)\n\
         }\n"
    ));
    // The blob byte view is real for futures.
    assert!(out.contains(
        "func (s Sig) Bytes() []byte {\n\
         \treturn (s)[:]\n\
         }\n"
    ));
}

#[test]
fn protocol_with_headers() {
    let out = compile(
        "protocol P @0xdeadbeef errors(E) argHeader(H1) resHeader(H2) { ping @0() -> void; }",
    );

    assert!(out.contains("var PProtocolID rpc.ProtocolUniqueID = rpc.ProtocolUniqueID(0xdeadbeef)\n"));
    // Arg struct for the nullary method.
    assert!(out.contains("type PingArg struct {\n}\n"));
    assert!(out.contains("type PingArgInternal__ struct {"));

    assert!(out.contains(
        "type PInterface interface {\n\
         \tPing(context.Context) (error)\n\
         \tErrorWrapper() func(error) E\n\
         \tCheckArgHeader(ctx context.Context, h H1) error\n\
         \tMakeResHeader() H2\n\
         }\n"
    ));

    // The declared error type is derived, so the wrapper exports it.
    assert!(out.contains("\treturn f(err).Export()\n"));
    assert!(out.contains("type PErrorUnwrapper func(E) error\n"));
    assert!(out.contains("type PErrorWrapper func(error) E\n"));
    assert!(out.contains("type pErrorUnwrapperAdapter struct {"));
    assert!(out.contains("\treturn &EInternal__{}\n"));
    assert!(out.contains("var _ rpc.ErrorUnwrapper = pErrorUnwrapperAdapter{}\n"));

    assert!(out.contains(
        "type PClient struct {\n\
         \tCli rpc.GenericClient\n\
         \tErrorUnwrapper PErrorUnwrapper\n\
         \tMakeArgHeader func() H1\n\
         \tCheckResHeader func(context.Context, H2) error\n\
         }\n"
    ));

    // The client wraps the argument in a DataWrap envelope.
    assert!(out.contains(
        "\twarg := &rpc.DataWrap[H1, *PingArgInternal__] {\n\
         \t\tData: arg.Export(),\n\
         \t}\n"
    ));
    assert!(out.contains("\tvar tmp rpc.DataWrap[H2, interface{}]\n"));
    assert!(out.contains(
        "\terr = c.Cli.Call2(ctx, rpc.NewMethodV2(PProtocolID, 0, \"P.ping\"), warg, &tmp, \
         0 * time.Millisecond, pErrorUnwrapperAdapter{h: c.ErrorUnwrapper})\n"
    ));
    assert!(out.contains(
        "\tif c.CheckResHeader != nil {\n\
         \t\terr = c.CheckResHeader(ctx, tmp.Header)\n"
    ));

    // The server handler checks the arg header and wraps the response.
    assert!(out.contains("typedWrappedArg, ok := args.(*rpc.DataWrap[H1, *PingArgInternal__])"));
    assert!(out.contains("if err := i.CheckArgHeader(ctx, typedWrappedArg.Header); err != nil {"));
    assert!(out.contains("ret := rpc.DataWrap[H2, interface{}]{"));
    assert!(out.contains("Header : i.MakeResHeader(),"));

    assert!(out.contains("func PProtocol(i PInterface) rpc.ProtocolV2 {"));
    assert!(out.contains("Name: \"P\","));
    assert!(out.contains("ID: PProtocolID,"));
    assert!(out.contains("Methods: map[rpc.Position]rpc.ServeHandlerDescriptionV2{"));
    assert!(out.contains("Name: \"ping\","));
    assert!(out.contains("WrapError: PMakeGenericErrorWrapper(i.ErrorWrapper()),"));

    assert!(out.contains(
        "func init() {\n\
         \trpc.AddUnique(PProtocolID)\n\
         }\n"
    ));
}

#[test]
fn protocol_single_argument_optimization() {
    let out = compile(
        "protocol Echo @0xcafecafe errors(E) { echo @3(n @0: Uint) -> Uint; }",
    );
    // The lone position-zero parameter surfaces directly in the client
    // signature, and the stub builds the arg struct itself.
    assert!(out.contains("func (c EchoClient) Echo (ctx context.Context, n uint64) (res uint64, err error) {"));
    assert!(out.contains(
        "\targ := EchoArg{\n\
         \t\tN: n,\n\
         \t}\n"
    ));
    // No headers declared: the argument travels bare.
    assert!(out.contains("\twarg := arg.Export()\n"));
    assert!(out.contains("\tvar tmp uint64\n"));
    assert!(out.contains("\tres = tmp\n"));
    // The server interface and dispatch unwrap the struct too.
    assert!(out.contains("\tEcho(context.Context, uint64) (uint64, error)\n"));
    assert!(out.contains("typedArg, ok := args.(*EchoArgInternal__)"));
    assert!(out.contains("tmp, err := i.Echo(ctx, (typedArg.Import()).N)"));
    assert!(out.contains("return tmp, nil"));
    assert!(out.contains("rpc.NewMethodV2(EchoProtocolID, 3, \"Echo.echo\")"));
}

#[test]
fn protocol_multi_argument_method() {
    let out = compile(
        "protocol Kv @0xcafecafe errors(E) { put @0(k @0: Text, v @1: Blob) -> void as PutReq; }",
    );
    // The programmer-supplied arg struct name wins.
    assert!(out.contains("type PutReq struct {\n\tK string\n\tV []byte\n}\n"));
    assert!(out.contains("func (c KvClient) Put (ctx context.Context, arg PutReq) (err error) {"));
    assert!(out.contains("Put(context.Context, PutReq) (error)"));
    // Void result: the handler call binds no result value.
    assert!(!out.contains("tmp, err := i.Put"));
    assert!(out.contains("err := i.Put(ctx, (typedArg.Import()))"));
}

#[test]
fn protocol_list_result() {
    let out = compile(
        "protocol Scan @0xcafecafe errors(E) { keys @0() -> List(Text); }",
    );
    // List results import on the client and export in the server handler.
    assert!(out.contains("func (c ScanClient) Keys (ctx context.Context) (res []string, err error) {"));
    assert!(out.contains("\tres = (func (x *[](string)) (ret []string) {"));
    assert!(out.contains("\tlst := (func (x []string) * [](string) {"));
    assert!(out.contains("return lst, nil"));
}

#[test]
fn go_imports_are_emitted_and_others_recorded() {
    let out = compile(
        "go:import \"github.com/acme/lib\" as acme;\n\
         ts:import \"acme-lib\" as acme;",
    );
    assert!(out.contains("import acme \"github.com/acme/lib\"\n"));
    assert!(!out.contains("acme-lib"));
}

#[test]
fn doc_comments_reach_the_output() {
    let out = compile("/** A counter. */\ntypedef Foo = Uint;");
    assert!(out.contains("//  A counter. \ntype Foo uint64\n"));
}

#[test]
fn one_handler_entry_per_method() {
    let out = compile(
        "protocol P @0xdeadbeef errors(E) {\n\
         a @0() -> void;\n\
         b @1() -> void;\n\
         c @7() -> void;\n\
         }",
    );
    for entry in ["0: {", "1: {", "7: {"] {
        assert_eq!(
            out.matches(&format!("\t\t\t{}\n", entry)).count(),
            1,
            "expected exactly one handler entry {:?}",
            entry
        );
    }
    // One client method per protocol method.
    for m in ["A", "B", "C"] {
        assert!(out.contains(&format!("func (c PClient) {} (ctx context.Context)", m)));
    }
}

#[test]
fn option_fields_null_propagate() {
    let out = compile("struct S { note @0: Option(Text); friends @1: List(Text); }");
    // Option of a primitive in a struct field passes the bound pointer
    // through on export.
    assert!(out.contains("\t\tNote: s.Note,\n"));
    // Wrapping an optional field for the wire stays a single pointer.
    assert!(out.contains("\tNote *string\n"));
    assert!(out.contains("\tFriends *[](string)\n"));
}
